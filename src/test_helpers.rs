use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::host::disk::{DiskInfo, DiskManager};
use crate::host::process::ProcessProbe;
use crate::host::{Host, Platform};
use crate::utils::fsutil;

pub static TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Write `appmanifest_<appid>.acf` into `dir`, creating it if needed.
pub fn write_manifest(
    dir: &Path,
    appid: u32,
    name: Option<&str>,
    installdir: &str,
    size: u64,
) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let name_line = name
        .map(|n| format!("\t\"name\"\t\t\"{}\"\n", n))
        .unwrap_or_default();
    let contents = format!(
        "\"AppState\"\n{{\n\t\"appid\"\t\t\"{appid}\"\n\t\"Universe\"\t\t\"1\"\n{name_line}\t\"StateFlags\"\t\t\"4\"\n\t\"installdir\"\t\t\"{installdir}\"\n\t\"SizeOnDisk\"\t\t\"{size}\"\n}}\n"
    );
    let path = dir.join(format!("appmanifest_{}.acf", appid));
    fs::write(&path, contents).unwrap();
    path
}

/// Create `path` holding exactly `bytes` bytes spread over two files.
pub fn write_game_data(path: &Path, bytes: u64) {
    fs::create_dir_all(path.join("data")).unwrap();
    let head = bytes / 2;
    fs::write(path.join("game.bin"), vec![0u8; head as usize]).unwrap();
    fs::write(path.join("data").join("assets.pak"), vec![1u8; (bytes - head) as usize]).unwrap();
}

/// Volumes with a fixed amount of free space.
///
/// Paths under one of `mounts` live on that volume; everything else is on `/`.
pub struct FakeDisks {
    pub free_bytes: u64,
    pub capacity_bytes: u64,
    pub mounts: Vec<PathBuf>,
    pub queried: RefCell<Vec<PathBuf>>,
}

impl Default for FakeDisks {
    fn default() -> Self {
        Self {
            free_bytes: 500 * 1024 * 1024 * 1024,
            capacity_bytes: 1024 * 1024 * 1024 * 1024,
            mounts: Vec::new(),
            queried: RefCell::new(Vec::new()),
        }
    }
}

impl DiskManager for FakeDisks {
    fn volume(&self, path: &Path) -> Result<DiskInfo> {
        self.queried.borrow_mut().push(path.to_path_buf());
        let root = self
            .mounts
            .iter()
            .filter(|mount| path.starts_with(mount))
            .max_by_key(|mount| mount.components().count())
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok(DiskInfo {
            root,
            free_bytes: self.free_bytes,
            capacity_bytes: self.capacity_bytes,
        })
    }

    fn usage(&self, path: &Path) -> Result<u64> {
        fsutil::directory_size(path)
    }

    fn translate_path(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

pub struct FakeProcesses {
    pub running: BTreeSet<String>,
}

impl ProcessProbe for FakeProcesses {
    fn running_processes(&self) -> Result<BTreeSet<String>> {
        Ok(self.running.clone())
    }

    fn case_insensitive(&self) -> bool {
        false
    }
}

/// A Linux host with the given processes running.
pub fn fake_host(running: &[&str]) -> Host {
    fake_host_with_disks(running, FakeDisks::default())
}

pub fn fake_host_with_disks(running: &[&str], disks: FakeDisks) -> Host {
    Host::new(
        Platform::Linux,
        Box::new(FakeProcesses {
            running: running.iter().map(|s| s.to_string()).collect(),
        }),
        Box::new(disks),
    )
}

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::Disks;

use crate::error::{Error, Result};
use crate::utils::fsutil;

/// The volume holding a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskInfo {
    /// Mount point (or drive root on Windows).
    pub root: PathBuf,
    pub free_bytes: u64,
    pub capacity_bytes: u64,
}

/// How paths read from Steam's own files map onto the paths we can open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathStyle {
    Native,
    /// `D:\Games` is reachable as `/mnt/d/Games`.
    WslMount,
}

pub trait DiskManager {
    fn volume(&self, path: &Path) -> Result<DiskInfo>;

    /// Bytes used under `path`.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] where the host cannot measure this.
    fn usage(&self, path: &Path) -> Result<u64>;

    /// Convert a path as written by Steam into one this process can open.
    fn translate_path(&self, path: &str) -> PathBuf;

    fn free_space(&self, path: &Path) -> Result<u64> {
        Ok(self.volume(path)?.free_bytes)
    }

    fn capacity(&self, path: &Path) -> Result<u64> {
        Ok(self.volume(path)?.capacity_bytes)
    }

    fn same_partition(&self, a: &Path, b: &Path) -> Result<bool> {
        Ok(self.volume(a)?.root == self.volume(b)?.root)
    }
}

pub struct SysinfoDisks {
    style: PathStyle,
    usage_supported: bool,
}

impl SysinfoDisks {
    pub fn new(style: PathStyle, usage_supported: bool) -> Self {
        Self {
            style,
            usage_supported,
        }
    }
}

impl DiskManager for SysinfoDisks {
    fn volume(&self, path: &Path) -> Result<DiskInfo> {
        let target = nearest_existing_path(path);
        // canonicalize() yields verbatim `\\?\C:\` paths on Windows, which never
        // share a prefix with the reported mount points.
        let target = if cfg!(windows) {
            target
        } else {
            fs::canonicalize(&target).unwrap_or(target)
        };

        let disks = Disks::new_with_refreshed_list();
        let candidates = disks.list().iter().map(|disk| DiskInfo {
            root: disk.mount_point().to_path_buf(),
            free_bytes: disk.available_space(),
            capacity_bytes: disk.total_space(),
        });
        pick_volume(candidates, &target).ok_or_else(|| {
            Error::Unsupported(format!("no mounted volume contains {}", path.display()))
        })
    }

    fn usage(&self, path: &Path) -> Result<u64> {
        if !self.usage_supported {
            return Err(Error::Unsupported(format!(
                "disk usage of {} cannot be measured on this host",
                path.display()
            )));
        }
        fsutil::directory_size(path)
    }

    fn translate_path(&self, path: &str) -> PathBuf {
        match self.style {
            PathStyle::Native => PathBuf::from(path),
            PathStyle::WslMount => wsl_path(path),
        }
    }
}

/// The volume with the longest mount point that is a prefix of `target`.
fn pick_volume(candidates: impl Iterator<Item = DiskInfo>, target: &Path) -> Option<DiskInfo> {
    candidates
        .filter(|disk| target.starts_with(&disk.root))
        .max_by_key(|disk| disk.root.components().count())
}

fn nearest_existing_path(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while !candidate.exists() {
        if !candidate.pop() {
            return PathBuf::from(".");
        }
    }
    candidate
}

/// `X:\a\b` becomes `/mnt/x/a/b`; anything else just gets forward slashes.
fn wsl_path(path: &str) -> PathBuf {
    let bytes = path.as_bytes();
    let (mut out, rest) = if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        let drive = (bytes[0] as char).to_ascii_lowercase().to_string();
        (PathBuf::from("/mnt").join(drive), &path[2..])
    } else if path.starts_with('/') || path.starts_with('\\') {
        (PathBuf::from("/"), path)
    } else {
        (PathBuf::new(), path)
    };

    for segment in rest.split(['\\', '/']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(segment),
        }
    }
    out
}

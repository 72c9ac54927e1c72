use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const LOCK_FILE_NAME: &str = ".steam-archivist.lock";

/// Exclusive claim on a set of library/archive roots for the duration of a
/// transfer. Lock files are removed on drop.
#[derive(Debug)]
pub struct RootLock {
    files: Vec<PathBuf>,
}

impl RootLock {
    /// Lock every root in `roots`. Either all are locked or none are.
    pub fn acquire<P: AsRef<Path>>(roots: &[P]) -> Result<Self> {
        let mut lock = RootLock { files: Vec::new() };
        for root in roots {
            let root = root.as_ref();
            let file = root.join(LOCK_FILE_NAME);
            if lock.files.contains(&file) {
                continue;
            }
            fs::create_dir_all(root)?;
            match OpenOptions::new().write(true).create_new(true).open(&file) {
                Ok(mut handle) => {
                    writeln!(handle, "{}", std::process::id())?;
                    lock.files.push(file);
                }
                // Dropping `lock` releases anything taken so far.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(Error::Busy(root.to_path_buf()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(lock)
    }
}

impl Drop for RootLock {
    fn drop(&mut self) {
        for file in &self.files {
            if let Err(e) = fs::remove_file(file) {
                log::warn!("could not release lock {}: {}", file.display(), e);
            }
        }
    }
}

use std::fs;
use std::io;
use std::path::Path;
#[cfg(unix)]
use std::os::unix::fs as unix_fs;

use walkdir::WalkDir;

use crate::error::Result;

/// Sum of the sizes of all regular files under `path`.
///
/// Symlinks are not followed. Fails if `path` does not exist; callers that
/// expect missing directories should check first.
pub fn directory_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )
        .into());
    }

    let mut total = 0;
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            total += entry.metadata().map_err(io::Error::from)?.len();
        }
    }
    Ok(total)
}

/// Like [`directory_size`] but a missing directory counts as empty.
pub fn directory_size_or_zero(path: &Path) -> Result<u64> {
    if path.exists() {
        directory_size(path)
    } else {
        Ok(0)
    }
}

/// Recursively copy `src` to `dst`, merging into `dst` if it exists.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dest_path = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            #[cfg(unix)]
            unix_fs::symlink(&target, &dest_path)?;
            #[cfg(not(unix))]
            fs::copy(target, dest_path)?;
        } else {
            fs::copy(entry.path(), dest_path)?;
        }
    }
    Ok(())
}

/// Best-effort removal of a file or directory tree left behind by a failed
/// transfer.
pub fn remove_quietly(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not clean up {}: {}", path.display(), e),
    }
}

pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

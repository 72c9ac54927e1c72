//! Bulk copy tools.
//!
//! Each tool copies a file or directory to an exact destination path. Which
//! tool gets used is decided by [`Cloner::from_strategy`]: the configured
//! preference list is walked in order and the first tool whose probe
//! succeeds wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::utils::dependencies::command_available;
use crate::utils::fsutil;

pub const DEFAULT_STRATEGY: [&str; 3] = ["rclone", "rsync", "copytree"];

pub trait CloneTool {
    fn name(&self) -> &'static str;

    /// Side-effect free availability probe.
    fn is_available(&self) -> bool;

    /// Copy `source` so that it ends up exactly at `destination`.
    ///
    /// For a directory source the contents land inside `destination`; for a
    /// file source `destination` is the new file path. The parent of
    /// `destination` already exists.
    fn clone_to(&self, source: &Path, destination: &Path) -> Result<()>;
}

fn run_tool(command: &mut Command) -> Result<()> {
    log::debug!("running {:?}", command);
    let output = command.output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Io(std::io::Error::other(format!(
            "{:?} exited with {}: {}",
            command,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))))
    }
}

/// Trailing separator so `rsync` copies directory contents rather than the
/// directory itself.
fn with_trailing_separator(path: &Path) -> String {
    let mut s = path.display().to_string();
    if !s.ends_with(std::path::MAIN_SEPARATOR) {
        s.push(std::path::MAIN_SEPARATOR);
    }
    s
}

pub struct Rclone;

impl CloneTool for Rclone {
    fn name(&self) -> &'static str {
        "rclone"
    }

    fn is_available(&self) -> bool {
        command_available("rclone")
    }

    fn clone_to(&self, source: &Path, destination: &Path) -> Result<()> {
        let mut command = Command::new("rclone");
        if source.is_file() {
            command.args(["copyto", "--no-traverse"]);
        } else {
            command.arg("copy");
        }
        run_tool(command.arg(source).arg(destination))
    }
}

pub struct Rsync;

impl CloneTool for Rsync {
    fn name(&self) -> &'static str {
        "rsync"
    }

    fn is_available(&self) -> bool {
        command_available("rsync")
    }

    fn clone_to(&self, source: &Path, destination: &Path) -> Result<()> {
        let mut command = Command::new("rsync");
        command.arg("-a");
        if source.is_dir() {
            command
                .arg(with_trailing_separator(source))
                .arg(with_trailing_separator(destination));
        } else {
            command.arg(source).arg(destination);
        }
        run_tool(&mut command)
    }
}

/// Built-in recursive copy. Always available.
pub struct CopyTree;

impl CloneTool for CopyTree {
    fn name(&self) -> &'static str {
        "copytree"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn clone_to(&self, source: &Path, destination: &Path) -> Result<()> {
        if source.is_dir() {
            fsutil::copy_dir_recursive(source, destination)
        } else {
            fs::copy(source, destination)?;
            Ok(())
        }
    }
}

type Constructor = fn() -> Box<dyn CloneTool>;

fn rclone() -> Box<dyn CloneTool> {
    Box::new(Rclone)
}

fn rsync() -> Box<dyn CloneTool> {
    Box::new(Rsync)
}

fn copytree() -> Box<dyn CloneTool> {
    Box::new(CopyTree)
}

/// Every tool we know how to drive, keyed by the name used in settings.
pub fn registry() -> Vec<(&'static str, Constructor)> {
    vec![("rclone", rclone), ("rsync", rsync), ("copytree", copytree)]
}

fn lookup(name: &str) -> Option<Constructor> {
    registry()
        .into_iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, constructor)| constructor)
}

/// The copy tool picked for this run.
pub struct Cloner {
    tool: Box<dyn CloneTool>,
}

impl Cloner {
    pub fn new(tool: Box<dyn CloneTool>) -> Self {
        Self { tool }
    }

    /// First available tool from `strategy`, in order.
    ///
    /// Unknown names are logged and skipped.
    pub fn from_strategy<S: AsRef<str>>(strategy: &[S]) -> Result<Self> {
        for name in strategy {
            let name = name.as_ref();
            match lookup(name) {
                Some(constructor) => {
                    let tool = constructor();
                    if tool.is_available() {
                        log::info!("Clone tool: {}", tool.name());
                        return Ok(Self::new(tool));
                    }
                    log::debug!("clone tool {} is not available", name);
                }
                None => log::error!("Unrecognised clone tool '{}'", name),
            }
        }
        Err(Error::ToolUnavailable(
            strategy
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    pub fn tool_name(&self) -> &'static str {
        self.tool.name()
    }

    /// Copy `source` to exactly `destination`, creating parents as needed.
    pub fn copy_to(&self, source: &Path, destination: &Path) -> Result<()> {
        if !source.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", source.display()),
            )));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        log::debug!(
            "{}: {} -> {}",
            self.tool.name(),
            source.display(),
            destination.display()
        );
        self.tool.clone_to(source, destination)
    }

    /// Copy `source` into the directory `destination_dir` and return where it
    /// landed.
    pub fn copy_into(&self, source: &Path, destination_dir: &Path) -> Result<PathBuf> {
        let target = nested_destination(source, destination_dir);
        self.copy_to(source, &target)?;
        Ok(target)
    }
}

/// Where [`Cloner::copy_into`] puts `source`.
///
/// Files keep their name inside the directory; directories get their
/// basename appended unless the destination already carries it, so the copy
/// is never flattened into `destination_dir`.
pub fn nested_destination(source: &Path, destination_dir: &Path) -> PathBuf {
    let Some(basename) = source.file_name() else {
        return destination_dir.to_path_buf();
    };
    if source.is_dir() && destination_dir.file_name() == Some(basename) {
        destination_dir.to_path_buf()
    } else {
        destination_dir.join(basename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Missing;

    impl CloneTool for Missing {
        fn name(&self) -> &'static str {
            "missing"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn clone_to(&self, _source: &Path, _destination: &Path) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn test_strategy_falls_through_to_copytree() {
        let cloner = Cloner::from_strategy(&["nonsense", "CopyTree"]).unwrap();
        assert_eq!(cloner.tool_name(), "copytree");
    }

    #[test]
    fn test_strategy_with_nothing_usable() {
        assert!(matches!(
            Cloner::from_strategy(&["nonsense"]),
            Err(Error::ToolUnavailable(_))
        ));
        assert!(!Missing.is_available());
    }

    #[test]
    fn test_copy_into_does_not_flatten() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("Game");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("bin/game.exe"), b"MZ").unwrap();
        fs::write(dir.path().join("appmanifest_1.acf"), b"{}").unwrap();

        let archive = dir.path().join("archive");
        let cloner = Cloner::new(Box::new(CopyTree));

        let landed = cloner.copy_into(&src, &archive).unwrap();
        assert_eq!(landed, archive.join("Game"));
        assert!(archive.join("Game/bin/game.exe").exists());

        let landed = cloner
            .copy_into(&dir.path().join("appmanifest_1.acf"), &archive)
            .unwrap();
        assert_eq!(landed, archive.join("appmanifest_1.acf"));
        assert!(landed.is_file());

        // Destination already named after the source.
        let landed = cloner.copy_into(&src, &archive.join("Game")).unwrap();
        assert_eq!(landed, archive.join("Game"));
    }

    #[test]
    fn test_copy_to_missing_source() {
        let dir = tempdir().unwrap();
        let cloner = Cloner::new(Box::new(CopyTree));
        assert!(cloner
            .copy_to(&dir.path().join("nope"), &dir.path().join("dst"))
            .is_err());
        assert!(!dir.path().join("dst").exists());
    }
}

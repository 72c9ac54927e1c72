use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid manifest {path}: {message}")]
    Schema { path: PathBuf, message: String },

    #[error("{0} is running; close it before moving game data around.")]
    RunningProcess(String),

    #[error("Game is not archived: {0}. Archive it first or pass --force.")]
    NotArchived(String),

    #[error("Archived copy of {name} differs from the installed copy ({reason}).")]
    ArchiveMismatch { name: String, reason: String },

    #[error("Archiving {name} failed: {reason}")]
    ArchiveFailure { name: String, reason: String },

    #[error("Moving {name} failed: {reason}")]
    MoveFailure { name: String, reason: String },

    #[error("{path} is not under {root}")]
    Path { path: PathBuf, root: PathBuf },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{0}")]
    Usage(String),

    #[error("Operation cancelled.")]
    Cancelled,

    #[error("Another operation holds the lock on {0}")]
    Busy(PathBuf),

    #[error("Steam installation not found. Set apps.Steam.install-path in the settings file.")]
    SteamNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No usable copy tool among: {0}")]
    ToolUnavailable(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

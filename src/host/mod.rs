//! Platform facades.
//!
//! Everything that depends on the host OS sits behind a small trait here.
//! [`Host::detect`] picks the implementations once at startup and the rest of
//! the program only ever sees the trait objects.

pub mod clone;
pub mod disk;
pub mod process;
pub mod steam;

use std::fs;

use crate::error::Result;
use disk::{DiskManager, PathStyle, SysinfoDisks};
use process::{ProcessProbe, SysinfoProcesses, WslProcesses};

/// Where this binary is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Windows,
    /// Linux under the Windows Subsystem for Linux. Steam itself runs on the
    /// Windows host and library paths use drive letters.
    Wsl,
    Linux,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(windows) {
            return Platform::Windows;
        }
        let release = fs::read_to_string("/proc/sys/kernel/osrelease").unwrap_or_default();
        if is_wsl_release(&release) {
            Platform::Wsl
        } else {
            Platform::Linux
        }
    }

    /// Name of the Steam client process on this platform.
    pub fn steam_process_name(self) -> &'static str {
        match self {
            Platform::Windows | Platform::Wsl => "steam.exe",
            Platform::Linux => "steam",
        }
    }
}

fn is_wsl_release(release: &str) -> bool {
    release.to_lowercase().contains("microsoft")
}

pub struct Host {
    platform: Platform,
    processes: Box<dyn ProcessProbe>,
    disks: Box<dyn DiskManager>,
}

impl Host {
    /// Detect the platform and wire up the matching facades.
    pub fn detect() -> Self {
        let platform = Platform::detect();
        log::debug!("detected platform: {:?}", platform);
        match platform {
            Platform::Windows => Self::new(
                platform,
                Box::new(SysinfoProcesses::case_insensitive()),
                Box::new(SysinfoDisks::new(PathStyle::Native, false)),
            ),
            Platform::Wsl => Self::new(
                platform,
                Box::new(WslProcesses),
                Box::new(SysinfoDisks::new(PathStyle::WslMount, true)),
            ),
            Platform::Linux => Self::new(
                platform,
                Box::new(SysinfoProcesses::case_sensitive()),
                Box::new(SysinfoDisks::new(PathStyle::Native, true)),
            ),
        }
    }

    pub fn new(
        platform: Platform,
        processes: Box<dyn ProcessProbe>,
        disks: Box<dyn DiskManager>,
    ) -> Self {
        Self {
            platform,
            processes,
            disks,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn disks(&self) -> &dyn DiskManager {
        self.disks.as_ref()
    }

    pub fn steam_is_running(&self) -> Result<bool> {
        self.processes.is_running(self.platform.steam_process_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wsl_release_detection() {
        assert!(is_wsl_release("4.4.0-19041-Microsoft"));
        assert!(is_wsl_release("5.15.90.1-microsoft-standard-WSL2"));
        assert!(!is_wsl_release("6.8.0-45-generic"));
    }

    #[test]
    fn test_steam_process_names() {
        assert_eq!(Platform::Windows.steam_process_name(), "steam.exe");
        assert_eq!(Platform::Wsl.steam_process_name(), "steam.exe");
        assert_eq!(Platform::Linux.steam_process_name(), "steam");
    }
}

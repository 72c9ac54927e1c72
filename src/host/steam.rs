//! Locating the Steam installation root.

use std::path::PathBuf;
#[cfg(not(windows))]
use std::process::Command;

use crate::error::{Error, Result};
use crate::host::disk::DiskManager;
use crate::host::Platform;
use crate::settings::Settings;
use crate::utils::steam_paths;

/// Resolve the Steam install root.
///
/// A configured `apps.Steam.install-path` wins; otherwise ask the platform.
pub fn locate_steam_root(
    platform: Platform,
    disks: &dyn DiskManager,
    settings: &Settings,
) -> Result<PathBuf> {
    if let Some(configured) = settings.steam_install_path() {
        log::debug!("using configured Steam path {}", configured);
        return Ok(disks.translate_path(&configured));
    }

    let found = match platform {
        Platform::Windows => registry_install_path(),
        Platform::Wsl => host_registry_install_path().map(|p| disks.translate_path(&p)),
        Platform::Linux => steam_paths::steam_base_dirs().into_iter().next(),
    };
    found.ok_or(Error::SteamNotFound)
}

#[cfg(windows)]
fn registry_install_path() -> Option<PathBuf> {
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    if let Ok(key) = hkcu.open_subkey(r"SOFTWARE\Valve\Steam") {
        if let Ok(path) = key.get_value::<String, _>("SteamPath") {
            return Some(PathBuf::from(path));
        }
    }

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    for subkey in [r"SOFTWARE\Wow6432Node\Valve\Steam", r"SOFTWARE\Valve\Steam"] {
        if let Ok(key) = hklm.open_subkey(subkey) {
            if let Ok(path) = key.get_value::<String, _>("InstallPath") {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}

#[cfg(not(windows))]
fn registry_install_path() -> Option<PathBuf> {
    None
}

#[cfg(windows)]
fn host_registry_install_path() -> Option<String> {
    None
}

/// Ask the Windows host's registry through `reg.exe`.
#[cfg(not(windows))]
fn host_registry_install_path() -> Option<String> {
    let output = Command::new("reg.exe")
        .args(["query", r"HKCU\Software\Valve\Steam", "/v", "SteamPath"])
        .output()
        .ok()?;
    if !output.status.success() {
        log::debug!("reg.exe query failed: {}", output.status);
        return None;
    }
    parse_reg_query(&String::from_utf8_lossy(&output.stdout), "SteamPath")
}

/// Extract a `REG_SZ` value from `reg.exe query` output.
#[cfg_attr(windows, allow(dead_code))]
fn parse_reg_query(output: &str, value_name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix(value_name)?.trim_start();
        let value = rest.strip_prefix("REG_SZ")?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

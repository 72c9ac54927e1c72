//! Finding the libraries and archives on this machine.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use keyvalues_parser::{Value, Vdf};

use crate::core::archive::Archive;
use crate::core::library::Library;
use crate::error::{Error, Result};
use crate::host::disk::DiskManager;
use crate::host::steam::locate_steam_root;
use crate::host::Host;
use crate::settings::Settings;

/// Everything discovered in one run. Built fresh each time; nothing global.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    pub steam_root: Option<PathBuf>,
    pub libraries: Vec<Library>,
    /// Configured order; the first is the default archive.
    pub archives: Vec<Archive>,
}

impl Inventory {
    pub fn library(&self, index: usize) -> Result<&Library> {
        self.libraries.get(index).ok_or_else(|| {
            Error::Usage(format!(
                "no library #{} (found {})",
                index,
                self.libraries.len()
            ))
        })
    }

    pub fn archive(&self, index: usize) -> Result<&Archive> {
        self.archives.get(index).ok_or_else(|| {
            Error::Usage(format!(
                "no archive #{} (configured {})",
                index,
                self.archives.len()
            ))
        })
    }
}

pub fn discover(host: &Host, settings: &Settings) -> Result<Inventory> {
    let archives = discover_archives(settings, host.disks());
    let steam_root = match locate_steam_root(host.platform(), host.disks(), settings) {
        Ok(root) => root,
        Err(Error::SteamNotFound) => {
            log::warn!("{}", Error::SteamNotFound);
            return Ok(Inventory {
                steam_root: None,
                libraries: Vec::new(),
                archives,
            });
        }
        Err(e) => return Err(e),
    };
    log::debug!("Steam root: {}", steam_root.display());

    let libraries = discover_libraries(&steam_root, host.disks())?;
    Ok(Inventory {
        steam_root: Some(steam_root),
        libraries,
        archives,
    })
}

/// The Steam root's own library followed by every folder listed in
/// `steamapps/libraryfolders.vdf` that exists.
pub fn discover_libraries(steam_root: &Path, disks: &dyn DiskManager) -> Result<Vec<Library>> {
    let mut paths = vec![steam_root.to_path_buf()];

    let vdf_path = steam_root.join("steamapps").join("libraryfolders.vdf");
    match fs::read_to_string(&vdf_path) {
        Ok(contents) => {
            for raw in parse_libraryfolders(&vdf_path, &contents)? {
                paths.push(disks.translate_path(&raw));
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("{} not found", vdf_path.display());
        }
        Err(e) => return Err(e.into()),
    }

    let mut seen = HashSet::new();
    let mut libraries = Vec::new();
    for path in paths {
        if !path.exists() {
            log::warn!("library {} does not exist, skipping", path.display());
            continue;
        }
        let canon = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        if seen.insert(canon) {
            libraries.push(Library::new(path));
        }
    }
    Ok(libraries)
}

/// Library paths listed in a `libraryfolders.vdf`, in index order.
///
/// Handles both the legacy layout (`"1" "D:\\SteamLibrary"`) and the current
/// one (`"0" { "path" "D:\\SteamLibrary" ... }`).
pub fn parse_libraryfolders(path: &Path, contents: &str) -> Result<Vec<String>> {
    let vdf = Vdf::parse(contents).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let folders = if vdf.key.eq_ignore_ascii_case("libraryfolders") {
        vdf.value.get_obj()
    } else {
        vdf.value
            .get_obj()
            .and_then(|o| o.get("libraryfolders"))
            .and_then(|v| v.first())
            .and_then(Value::get_obj)
    }
    .ok_or_else(|| Error::Schema {
        path: path.to_path_buf(),
        message: "no libraryfolders section".to_string(),
    })?;

    let mut entries: Vec<(u32, String)> = Vec::new();
    for (key, values) in folders.iter() {
        // Non-numeric keys are bookkeeping such as ContentStatsID.
        let Ok(index) = key.parse::<u32>() else {
            continue;
        };
        let folder = match values.first() {
            Some(Value::Str(legacy)) => Some(legacy.to_string()),
            Some(Value::Obj(obj)) => obj
                .get("path")
                .and_then(|v| v.first())
                .and_then(Value::get_str)
                .map(String::from),
            None => None,
        };
        if let Some(folder) = folder {
            entries.push((index, folder));
        }
    }
    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, folder)| folder).collect())
}

/// Archives from the settings file, in configured order.
pub fn discover_archives(settings: &Settings, disks: &dyn DiskManager) -> Vec<Archive> {
    settings
        .archive_roots()
        .iter()
        .map(|root| {
            let archive = Archive::new(disks.translate_path(root));
            if !archive.path().exists() {
                log::warn!("archive {} is not reachable", archive.path().display());
            }
            archive
        })
        .collect()
}

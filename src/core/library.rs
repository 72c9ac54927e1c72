//! Steam libraries and the consistency checks run against them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

use crate::core::manifest::{AppManifest, Layout};
use crate::error::Result;
use crate::host::disk::DiskManager;
use crate::utils::fsutil;

/// Ratio of declared size a game's on-disk size may drift by before it is
/// reported.
pub const DISCREPANCY_THRESHOLD: f64 = 0.001;

/// Manifests keyed by display name, in scan order.
///
/// A later manifest with the same name replaces the earlier one but keeps
/// its position.
#[derive(Clone, Debug, Default)]
pub struct GameLookup {
    entries: Vec<(String, AppManifest)>,
}

impl GameLookup {
    fn from_manifests(manifests: impl IntoIterator<Item = AppManifest>) -> Self {
        let mut lookup = GameLookup::default();
        for manifest in manifests {
            let name = manifest.name();
            match lookup.entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => {
                    log::debug!("{} shadows an earlier manifest named {:?}", manifest.path().display(), name);
                    slot.1 = manifest;
                }
                None => lookup.entries.push((name, manifest)),
            }
        }
        lookup
    }

    pub fn get(&self, name: &str) -> Option<&AppManifest> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, manifest)| manifest)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AppManifest)> {
        self.entries.iter().map(|(name, manifest)| (name.as_str(), manifest))
    }

    pub fn manifests(&self) -> impl Iterator<Item = &AppManifest> {
        self.entries.iter().map(|(_, manifest)| manifest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A per-game size discrepancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeDelta {
    /// The manifest never recorded a size.
    Unknown,
    /// Declared minus on-disk bytes.
    Bytes(i64),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SizeDiscrepancies {
    /// Declared total minus bytes under the install directory. Always
    /// reported, however small.
    pub library: i64,
    pub games: BTreeMap<String, SizeDelta>,
}

/// A game in an archive that still has a live copy in some library.
#[derive(Clone, Debug, Serialize)]
pub struct RedundantCopy {
    pub installed: AppManifest,
    pub library: PathBuf,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IssueReport {
    /// Install directories no manifest accounts for, in their on-disk case.
    pub orphan_directories: BTreeSet<String>,
    /// Manifests whose install directory is missing.
    pub dangling_manifests: Vec<AppManifest>,
    pub size_discrepancies: SizeDiscrepancies,
    /// Only filled in for archives.
    pub redundant_data: Vec<RedundantCopy>,
}

impl IssueReport {
    /// True when nothing but the library-wide size delta is present.
    pub fn is_clean(&self) -> bool {
        self.orphan_directories.is_empty()
            && self.dangling_manifests.is_empty()
            && self.size_discrepancies.games.is_empty()
            && self.redundant_data.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Library {
    path: PathBuf,
    layout: Layout,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_layout(path, Layout::Library)
    }

    pub(crate) fn with_layout(path: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            path: expand_home(path.into()),
            layout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Directory holding the manifests.
    pub fn apps_path(&self) -> PathBuf {
        match self.layout {
            Layout::Library => self.path.join("steamapps"),
            Layout::Archive => self.path.clone(),
        }
    }

    /// Directory holding the install directories.
    pub fn install_path(&self) -> PathBuf {
        match self.layout {
            Layout::Library => self.apps_path().join("common"),
            Layout::Archive => self.path.clone(),
        }
    }

    /// Manifest files in scan order (ascending file name).
    fn manifest_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(self.apps_path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("acf")
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Fresh scan of the manifests in this library.
    ///
    /// Nothing is cached: every call re-reads the directory, and the returned
    /// iterator parses each file lazily.
    pub fn manifests(&self) -> Result<impl Iterator<Item = Result<AppManifest>>> {
        let layout = self.layout;
        Ok(self
            .manifest_paths()?
            .into_iter()
            .map(move |path| AppManifest::parse(&path, layout)))
    }

    /// All readable manifests. Unreadable ones are logged and skipped.
    pub fn games(&self) -> Result<Vec<AppManifest>> {
        Ok(self
            .manifests()?
            .filter_map(|manifest| match manifest {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    log::warn!("skipping manifest: {}", e);
                    None
                }
            })
            .collect())
    }

    pub fn game_lookup(&self) -> Result<GameLookup> {
        Ok(GameLookup::from_manifests(self.games()?))
    }

    /// Sum of the sizes the manifests declare. May differ from what is
    /// actually on disk; see [`detect_issues`](Self::detect_issues).
    pub fn declared_size(&self) -> Result<u64> {
        Ok(self.game_lookup()?.manifests().map(AppManifest::size).sum())
    }

    /// Bytes actually present under the install directory.
    ///
    /// Archives keep manifests next to the data, so only their
    /// subdirectories count.
    pub fn installed_size(&self) -> Result<u64> {
        match self.layout {
            Layout::Library => fsutil::directory_size_or_zero(&self.install_path()),
            Layout::Archive => {
                let entries = match fs::read_dir(&self.path) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
                    Err(e) => return Err(e.into()),
                };
                let mut total = 0;
                for entry in entries.flatten() {
                    if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                        total += fsutil::directory_size(&entry.path())?;
                    }
                }
                Ok(total)
            }
        }
    }

    pub fn free_space(&self, disks: &dyn DiskManager) -> Result<u64> {
        disks.free_space(&self.install_path())
    }

    /// What the host reports as used under the install directory.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`](crate::error::Error::Unsupported) where the
    /// host cannot measure usage.
    pub fn used_space(&self, disks: &dyn DiskManager) -> Result<u64> {
        let install_path = self.install_path();
        if !install_path.exists() {
            return Ok(0);
        }
        disks.usage(&install_path)
    }

    /// Games whose display name matches `pattern`, in scan order.
    pub fn find_by_name_pattern(&self, pattern: &str) -> Result<Vec<AppManifest>> {
        let re = Regex::new(pattern)?;
        Ok(self
            .game_lookup()?
            .iter()
            .filter(|(name, _)| re.is_match(name))
            .map(|(_, manifest)| manifest.clone())
            .collect())
    }

    pub fn detect_issues(&self) -> Result<IssueReport> {
        let lookup = self.game_lookup()?;

        let orphan_directories = self.orphan_directories(&lookup)?;
        let dangling_manifests: Vec<AppManifest> = lookup
            .manifests()
            .filter(|manifest| !manifest.install_path().exists())
            .cloned()
            .collect();
        let size_discrepancies = self.size_discrepancies(&lookup)?;

        Ok(IssueReport {
            orphan_directories,
            dangling_manifests,
            size_discrepancies,
            redundant_data: Vec::new(),
        })
    }

    fn orphan_directories(&self, lookup: &GameLookup) -> Result<BTreeSet<String>> {
        let entries = match fs::read_dir(self.install_path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let known: HashSet<String> = lookup
            .manifests()
            .filter_map(|manifest| {
                manifest
                    .install_path()
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
            })
            .collect();

        let mut orphans = BTreeSet::new();
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !known.contains(&name.to_lowercase()) {
                orphans.insert(name);
            }
        }
        Ok(orphans)
    }

    fn size_discrepancies(&self, lookup: &GameLookup) -> Result<SizeDiscrepancies> {
        let declared: u64 = lookup.manifests().map(AppManifest::size).sum();
        let library = declared as i64 - self.installed_size()? as i64;

        // Dangling games are already reported on their own.
        let present: Vec<(&str, &AppManifest)> = lookup
            .iter()
            .filter(|(_, manifest)| manifest.install_path().exists())
            .collect();

        let deltas: Vec<(String, Option<SizeDelta>)> = present
            .par_iter()
            .map(|(name, manifest)| -> Result<(String, Option<SizeDelta>)> {
                let delta = if manifest.size() == 0 {
                    Some(SizeDelta::Unknown)
                } else {
                    let delta = manifest.size_delta()?;
                    exceeds_threshold(delta, manifest.size()).then_some(SizeDelta::Bytes(delta))
                };
                Ok((name.to_string(), delta))
            })
            .collect::<Result<_>>()?;

        Ok(SizeDiscrepancies {
            library,
            games: deltas
                .into_iter()
                .filter_map(|(name, delta)| delta.map(|d| (name, d)))
                .collect(),
        })
    }
}

fn exceeds_threshold(delta: i64, declared: u64) -> bool {
    delta != 0 && (delta.unsigned_abs() as f64 / declared as f64) > DISCREPANCY_THRESHOLD
}

fn expand_home(path: PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    path
}

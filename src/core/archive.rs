//! Offline game archives.
//!
//! An archive is a flat directory: manifests and install directories sit side
//! by side in the root, with no `steamapps/common` nesting. Everything a
//! [`Library`] can do works on an archive through `Deref`.

use std::fs;
use std::ops::Deref;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::library::{IssueReport, Library, RedundantCopy};
use crate::core::manifest::{AppManifest, Layout};
use crate::error::{Error, Result};
use crate::host::disk::DiskManager;
use crate::utils::fsutil;
use crate::utils::lock::RootLock;
use crate::utils::prompt::Confirm;

/// Outcome of removing one game from an archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "name", rename_all = "kebab-case")]
pub enum Removal {
    Removed(String),
    /// The manifest was deleted but its data directory was already gone.
    DanglingManifest(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    library: Library,
}

impl Deref for Archive {
    type Target = Library;

    fn deref(&self) -> &Library {
        &self.library
    }
}

impl Archive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Library::with_layout(path, Layout::Archive),
        }
    }

    /// Archived games that still have a live copy in one of `libraries`.
    pub fn redundant_data(&self, libraries: &[Library]) -> Result<Vec<RedundantCopy>> {
        let archived = self.game_lookup()?;
        if archived.is_empty() {
            return Ok(Vec::new());
        }
        let live = libraries
            .iter()
            .map(|library| -> Result<_> { Ok((library, library.game_lookup()?)) })
            .collect::<Result<Vec<_>>>()?;

        let mut redundant = Vec::new();
        for (name, _) in archived.iter() {
            for (library, lookup) in &live {
                if let Some(installed) = lookup.get(name) {
                    redundant.push(RedundantCopy {
                        installed: installed.clone(),
                        library: library.path().to_path_buf(),
                    });
                }
            }
        }
        Ok(redundant)
    }

    /// Bytes the archive holds for `manifest`.
    pub fn archived_data_size(&self, manifest: &AppManifest) -> Result<u64> {
        fsutil::directory_size(&manifest.archived_install_path())
    }

    /// Library checks plus games that are both archived and installed.
    pub fn detect_issues(&self, libraries: &[Library]) -> Result<IssueReport> {
        let mut report = self.library.detect_issues()?;
        report.redundant_data = self.redundant_data(libraries)?;
        Ok(report)
    }

    /// Largest collection this archive's volume could hold, keeping a tenth
    /// of the volume free.
    pub fn max_size(&self, disks: &dyn DiskManager) -> Result<u64> {
        let usable = self.declared_size()? + disks.free_space(self.path())?;
        Ok(usable.saturating_sub(disks.capacity(self.path())? / 10))
    }

    /// Delete games from the archive.
    ///
    /// `manifest` names one game explicitly; `pattern` adds every game whose
    /// name matches. Every selected manifest is checked against the archive
    /// root before anything is touched, and nothing is deleted unless
    /// `confirm` answers exactly `Y`.
    pub fn remove(
        &self,
        manifest: Option<&AppManifest>,
        pattern: Option<&str>,
        confirm: &mut dyn Confirm,
    ) -> Result<Vec<Removal>> {
        if manifest.is_none() && pattern.is_none() {
            return Err(Error::Usage(
                "archive removal needs a game or a pattern".to_string(),
            ));
        }

        let mut selected: Vec<AppManifest> = Vec::new();
        if let Some(manifest) = manifest {
            selected.push(manifest.clone());
        }
        if let Some(pattern) = pattern {
            for found in self.find_by_name_pattern(pattern)? {
                if !selected.iter().any(|m| m.path() == found.path()) {
                    selected.push(found);
                }
            }
        }
        for manifest in &selected {
            manifest.ensure_relative_install_dir()?;
            self.check_owned(manifest)?;
        }
        if selected.is_empty() {
            log::info!("nothing in {} to remove", self.path().display());
            return Ok(Vec::new());
        }

        let names: Vec<String> = selected.iter().map(AppManifest::name).collect();
        let question = format!(
            "Remove {} from {}?",
            names.join(", "),
            self.path().display()
        );
        if !confirm.confirm(&question)? {
            return Err(Error::Cancelled);
        }

        let _lock = RootLock::acquire(&[self.path()])?;
        let mut removals = Vec::with_capacity(selected.len());
        for (manifest, name) in selected.iter().zip(names) {
            let data = manifest.install_path();
            let removal = if data.exists() {
                fs::remove_dir_all(&data)?;
                Removal::Removed(name)
            } else {
                log::warn!("{} has no data at {}", name, data.display());
                Removal::DanglingManifest(name)
            };
            fs::remove_file(manifest.path())?;
            log::info!("removed {} from archive", manifest.path().display());
            removals.push(removal);
        }
        Ok(removals)
    }

    /// The manifest's install directory must sit inside the archive root.
    ///
    /// The data itself may already be gone, so the manifest's directory is
    /// resolved and the install directory name joined onto it.
    fn check_owned(&self, manifest: &AppManifest) -> Result<()> {
        let install_path = manifest.install_path();
        let outside = || Error::Path {
            path: install_path.clone(),
            root: self.path().to_path_buf(),
        };
        let root = fs::canonicalize(self.path()).map_err(|_| outside())?;
        let parent = install_path
            .parent()
            .and_then(|parent| fs::canonicalize(parent).ok())
            .ok_or_else(outside)?;
        let resolved = install_path
            .file_name()
            .map(|name| parent.join(name))
            .ok_or_else(outside)?;
        if resolved != root && resolved.starts_with(&root) {
            Ok(())
        } else {
            Err(outside())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_game_data, write_manifest, FakeDisks};
    use std::path::Path;
    use tempfile::tempdir;

    fn archive_with(root: &Path, games: &[(u32, &str)]) -> Archive {
        fs::create_dir_all(root).unwrap();
        for (id, name) in games {
            write_manifest(root, *id, Some(name), name, 100);
            write_game_data(&root.join(name), 100);
        }
        Archive::new(root)
    }

    fn never_asked(_: &str) -> String {
        panic!("operator should not have been prompted")
    }

    #[test]
    fn test_archive_paths_are_flat() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha")]);
        assert_eq!(archive.apps_path(), dir.path());
        assert_eq!(archive.install_path(), dir.path());

        let games = archive.games().unwrap();
        assert_eq!(games[0].install_path(), dir.path().join("Alpha"));
        assert_eq!(archive.archived_data_size(&games[0]).unwrap(), 100);
        assert!(archive.detect_issues(&[]).unwrap().is_clean());
    }

    #[test]
    fn test_redundant_data() {
        let dir = tempdir().unwrap();
        let archive = archive_with(&dir.path().join("archive"), &[(1, "Alpha"), (2, "Beta")]);
        let library = Library::new(dir.path().join("lib"));
        write_manifest(&library.apps_path(), 2, Some("Beta"), "Beta", 100);
        write_manifest(&library.apps_path(), 3, Some("Gamma"), "Gamma", 100);

        let redundant = archive.redundant_data(&[library.clone()]).unwrap();
        assert_eq!(redundant.len(), 1);
        assert_eq!(redundant[0].installed.name(), "Beta");
        assert_eq!(redundant[0].library, library.path());

        let report = archive.detect_issues(&[library]).unwrap();
        assert_eq!(report.redundant_data.len(), 1);
    }

    #[test]
    fn test_max_size_keeps_a_tenth_free() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha"), (2, "Beta")]);
        let disks = FakeDisks {
            free_bytes: 1000,
            capacity_bytes: 5000,
            ..FakeDisks::default()
        };
        assert_eq!(archive.max_size(&disks).unwrap(), 200 + 1000 - 500);
    }

    #[test]
    fn test_remove_needs_a_selector() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[]);
        assert!(matches!(
            archive.remove(None, None, &mut never_asked),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_remove_out_of_root_fails_before_mutation() {
        let dir = tempdir().unwrap();
        let archive = archive_with(&dir.path().join("archive"), &[(1, "Alpha")]);
        let library = Library::new(dir.path().join("lib"));
        write_manifest(&library.apps_path(), 9, Some("Stray"), "Stray", 1);
        let stray = library.games().unwrap().remove(0);

        let result = archive.remove(Some(&stray), Some("Alpha"), &mut never_asked);
        assert!(matches!(result, Err(Error::Path { .. })));
        assert!(archive.path().join("Alpha").exists());
        assert!(archive.path().join("appmanifest_1.acf").exists());
        assert!(stray.path().exists());
    }

    #[test]
    fn test_remove_rejects_parent_install_dir() {
        let dir = tempdir().unwrap();
        let archive = archive_with(&dir.path().join("archives/a"), &[]);
        write_manifest(archive.path(), 13, Some("Bad"), "..", 1);
        let sibling = archive_with(&dir.path().join("archives/b"), &[(2, "Other")]);

        assert!(matches!(
            archive.remove(None, Some("Bad"), &mut never_asked),
            Err(Error::Precondition(_))
        ));
        assert!(sibling.path().join("Other").exists());
        assert!(archive.path().join("appmanifest_13.acf").exists());
    }

    #[test]
    fn test_remove_checks_install_path_not_manifest_path() {
        let dir = tempdir().unwrap();
        let archive = archive_with(&dir.path().join("archive"), &[(1, "Alpha")]);
        let library = Library::new(dir.path().join("lib"));
        write_manifest(&library.apps_path(), 9, Some("Stray"), "Stray", 1);
        write_game_data(&library.install_path().join("Stray"), 1);
        let stray = library.games().unwrap().remove(0);

        assert!(matches!(
            archive.remove(Some(&stray), None, &mut never_asked),
            Err(Error::Path { path, .. }) if path == stray.install_path()
        ));
        assert!(library.install_path().join("Stray").exists());
    }

    #[test]
    fn test_explicit_dangling_manifest_is_removed() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha")]);
        fs::remove_dir_all(dir.path().join("Alpha")).unwrap();
        let alpha = archive.games().unwrap().remove(0);

        let removed = archive.remove(Some(&alpha), None, &mut |_: &str| "Y".to_string()).unwrap();
        assert_eq!(removed, vec![Removal::DanglingManifest("Alpha".to_string())]);
        assert!(archive.games().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_through_symlinked_root() {
        let dir = tempdir().unwrap();
        let real = archive_with(&dir.path().join("real"), &[(1, "Alpha")]);
        std::os::unix::fs::symlink(real.path(), dir.path().join("link")).unwrap();
        let linked = Archive::new(dir.path().join("link"));
        let alpha = real.games().unwrap().remove(0);

        let removed = linked.remove(Some(&alpha), None, &mut |_: &str| "Y".to_string()).unwrap();
        assert_eq!(removed, vec![Removal::Removed("Alpha".to_string())]);
        assert!(!real.path().join("Alpha").exists());
    }

    #[test]
    fn test_remove_declined_changes_nothing() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha")]);
        let mut answer_lowercase = |_: &str| "y".to_string();

        assert!(matches!(
            archive.remove(None, Some("Alpha"), &mut answer_lowercase),
            Err(Error::Cancelled)
        ));
        assert_eq!(archive.games().unwrap().len(), 1);
        assert!(dir.path().join("Alpha").exists());
    }

    #[test]
    fn test_remove_nothing_selected() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha")]);
        let removed = archive.remove(None, Some("^Zeta"), &mut never_asked).unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn test_remove_games_and_dangling() {
        let dir = tempdir().unwrap();
        let archive = archive_with(dir.path(), &[(1, "Alpha"), (2, "Alpine"), (3, "Beta")]);
        fs::remove_dir_all(dir.path().join("Alpine")).unwrap();
        let beta = archive.game_lookup().unwrap().get("Beta").cloned().unwrap();

        let mut questions = Vec::new();
        let mut confirm = |q: &str| {
            questions.push(q.to_string());
            "Y".to_string()
        };
        let removed = archive.remove(Some(&beta), Some("^Alp"), &mut confirm).unwrap();

        assert_eq!(
            removed,
            vec![
                Removal::Removed("Beta".to_string()),
                Removal::Removed("Alpha".to_string()),
                Removal::DanglingManifest("Alpine".to_string()),
            ]
        );
        assert_eq!(questions.len(), 1);
        assert!(archive.games().unwrap().is_empty());
        assert!(!dir.path().join("Alpha").exists());
        assert!(!dir.path().join(crate::utils::lock::LOCK_FILE_NAME).exists());
    }
}

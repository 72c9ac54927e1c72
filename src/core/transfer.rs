//! Moving game data between libraries and archives.
//!
//! Every operation follows the same shape: check preconditions, stage the
//! manifest at the destination, commit the install directory, and undo the
//! staging if the commit fails. A manifest only ever becomes visible at a
//! destination together with its data.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::archive::Archive;
use crate::core::library::Library;
use crate::core::manifest::{AppManifest, Layout};
use crate::error::{Error, Result};
use crate::host::clone::{nested_destination, Cloner};
use crate::host::Host;
use crate::utils::fsutil;
use crate::utils::lock::RootLock;

#[derive(Clone, Copy, Debug, Default)]
pub struct MoveOptions {
    /// Skip the Steam-running check and the archived-copy check.
    pub force: bool,
    /// Rename instead of copy when source and destination share a volume.
    pub fast: bool,
}

/// A manifest copied to its destination ahead of the data.
///
/// Dropping it without calling [`commit`](Self::commit) rolls the destination
/// back to how it was before staging.
struct StagedManifest {
    path: PathBuf,
    previous: Option<Vec<u8>>,
    committed: bool,
}

impl StagedManifest {
    fn stage(cloner: &Cloner, manifest: &AppManifest, destination_dir: &Path) -> Result<Self> {
        let target = manifest
            .file_name()
            .map(|name| destination_dir.join(name))
            .ok_or_else(|| Error::Precondition(format!("{} has no file name", manifest.path().display())))?;
        let previous = match fs::read(&target) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let staged = StagedManifest {
            path: target,
            previous,
            committed: false,
        };
        cloner.copy_to(manifest.path(), &staged.path)?;
        log::debug!("staged {}", staged.path.display());
        Ok(staged)
    }

    fn commit(mut self) -> PathBuf {
        self.committed = true;
        self.path.clone()
    }
}

impl Drop for StagedManifest {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match &self.previous {
            Some(bytes) => {
                if let Err(e) = fs::write(&self.path, bytes) {
                    log::warn!("could not restore {}: {}", self.path.display(), e);
                }
            }
            None => fsutil::remove_quietly(&self.path),
        }
    }
}

pub struct Transfers<'a> {
    host: &'a Host,
    cloner: &'a Cloner,
    archives: &'a [Archive],
}

impl<'a> Transfers<'a> {
    pub fn new(host: &'a Host, cloner: &'a Cloner, archives: &'a [Archive]) -> Self {
        Self {
            host,
            cloner,
            archives,
        }
    }

    pub fn abort_if_steam_is_running(&self) -> Result<()> {
        if self.host.steam_is_running()? {
            return Err(Error::RunningProcess(
                self.host.platform().steam_process_name().to_string(),
            ));
        }
        Ok(())
    }

    /// Fail unless an archive holds an identical copy of `manifest`.
    ///
    /// Archives are searched by display name and the last one holding the
    /// game is the one compared against.
    pub fn abort_if_not_archived(&self, manifest: &AppManifest) -> Result<()> {
        let name = manifest.name();
        let mut found = None;
        for archive in self.archives {
            if let Some(archived) = archive.game_lookup()?.get(&name) {
                found = Some((archive, archived.clone()));
            }
        }
        let Some((archive, archived)) = found else {
            return Err(Error::NotArchived(name));
        };
        log::debug!("comparing {} against {}", name, archive.path().display());

        if archived != *manifest {
            return Err(Error::ArchiveMismatch {
                name,
                reason: format!("manifest differs from {}", archived.path().display()),
            });
        }
        let delta = manifest.size_on_disk()? as i64 - archive.archived_data_size(&archived)? as i64;
        if delta != 0 {
            return Err(Error::ArchiveMismatch {
                name,
                reason: format!("installed data differs by {} bytes", delta),
            });
        }
        Ok(())
    }

    fn default_archive(&self) -> Result<&'a Archive> {
        self.archives
            .first()
            .ok_or_else(|| Error::Config("no archives configured".to_string()))
    }

    /// Copy a game into an archive, all or nothing.
    pub fn archive(&self, manifest: &AppManifest, archive: Option<&Archive>) -> Result<AppManifest> {
        let archive = match archive {
            Some(archive) => archive,
            None => self.default_archive()?,
        };
        self.abort_if_steam_is_running()?;
        manifest.ensure_relative_install_dir()?;

        let name = manifest.name();
        let source = manifest.install_path();
        let destination = nested_destination(&source, &archive.install_path());
        if destination != archive.install_path().join(manifest.install_dir()) {
            return Err(Error::Precondition(format!(
                "{} would be copied over the archive root {}",
                name,
                archive.path().display()
            )));
        }
        let _lock = RootLock::acquire(&[manifest_dir(manifest), archive.apps_path()])?;
        log::info!("Archiving {} to {}", name, archive.path().display());

        let existed = destination.exists();
        let staged = StagedManifest::stage(self.cloner, manifest, &archive.apps_path()).map_err(
            |e| Error::ArchiveFailure {
                name: name.clone(),
                reason: e.to_string(),
            },
        )?;
        if let Err(e) = self.cloner.copy_into(&source, &archive.install_path()) {
            if !existed {
                fsutil::remove_quietly(&destination);
            }
            return Err(Error::ArchiveFailure {
                name,
                reason: e.to_string(),
            });
        }

        AppManifest::parse(&staged.commit(), Layout::Archive)
    }

    /// Move a game to another library.
    ///
    /// Unless forced, the game must be archived first so that a failure half
    /// way never loses the only copy.
    pub fn move_game(
        &self,
        manifest: &AppManifest,
        destination: &Library,
        options: MoveOptions,
    ) -> Result<AppManifest> {
        if !options.force {
            self.abort_if_steam_is_running()?;
        }
        manifest.ensure_relative_install_dir()?;
        if !options.force {
            self.abort_if_not_archived(manifest)?;
        }

        let name = manifest.name();
        let source = manifest.install_path();
        let target = destination.install_path().join(manifest.install_dir());
        if manifest_dir(manifest) == destination.apps_path() {
            return Err(Error::Precondition(format!(
                "{} is already in {}",
                name,
                destination.path().display()
            )));
        }
        if target.exists() {
            return Err(Error::Precondition(format!(
                "{} already exists",
                target.display()
            )));
        }

        let _lock = RootLock::acquire(&[manifest_dir(manifest), destination.apps_path()])?;
        let rename = options.fast && self.same_partition(&source, destination.path());
        log::info!(
            "Moving {} to {}{}",
            name,
            destination.path().display(),
            if rename { " (rename)" } else { "" }
        );

        let failure = |e: Error| Error::MoveFailure {
            name: name.clone(),
            reason: e.to_string(),
        };
        let staged = StagedManifest::stage(self.cloner, manifest, &destination.apps_path())
            .map_err(failure)?;
        let committed = if rename {
            fs::create_dir_all(destination.install_path())
                .and_then(|()| fs::rename(&source, &target))
                .map_err(Error::from)
        } else {
            self.cloner.copy_to(&source, &target)
        };
        if let Err(e) = committed {
            if !rename {
                fsutil::remove_quietly(&target);
            }
            return Err(failure(e));
        }
        let moved = staged.commit();

        if !rename {
            fs::remove_dir_all(&source)?;
        }
        fs::remove_file(manifest.path())?;
        AppManifest::parse(&moved, Layout::Library)
    }

    fn same_partition(&self, source: &Path, destination: &Path) -> bool {
        match self.host.disks().same_partition(source, destination) {
            Ok(true) => true,
            Ok(false) => {
                log::warn!("--fast ignored: source and destination are on different volumes");
                false
            }
            Err(e) => {
                log::warn!("--fast ignored: {}", e);
                false
            }
        }
    }

    /// Copy an archived game's data back into a library.
    ///
    /// Only the data is copied. Steam recreates the manifest when asked to
    /// install the game into that library.
    pub fn restore(&self, archived: &AppManifest, destination: &Library) -> Result<PathBuf> {
        self.abort_if_steam_is_running()?;
        archived.ensure_relative_install_dir()?;

        let name = archived.name();
        let source = archived.archived_install_path();
        let target = destination.install_path().join(archived.install_dir());
        if target.exists() {
            return Err(Error::Precondition(format!(
                "{} already exists",
                target.display()
            )));
        }

        let _lock = RootLock::acquire(&[manifest_dir(archived), destination.apps_path()])?;
        log::info!("Restoring {} to {}", name, destination.path().display());
        if let Err(e) = self.cloner.copy_to(&source, &target) {
            fsutil::remove_quietly(&target);
            return Err(Error::MoveFailure {
                name,
                reason: e.to_string(),
            });
        }
        Ok(target)
    }

    /// Delete a game from its library. Not transactional.
    pub fn remove(&self, manifest: &AppManifest, force: bool) -> Result<()> {
        if !force {
            self.abort_if_steam_is_running()?;
        }
        manifest.ensure_relative_install_dir()?;
        if !force {
            self.abort_if_not_archived(manifest)?;
        }

        let _lock = RootLock::acquire(&[manifest_dir(manifest)])?;
        let data = manifest.install_path();
        if data.exists() {
            fs::remove_dir_all(&data)?;
        } else {
            log::warn!("{} was already missing", data.display());
        }
        fs::remove_file(manifest.path())?;
        log::info!("Removed {}", manifest.name());
        Ok(())
    }
}

fn manifest_dir(manifest: &AppManifest) -> PathBuf {
    manifest
        .path()
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

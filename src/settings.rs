//! User settings (`settings.json`).
//!
//! ```json
//! {
//!   "collections": { "archives": ["/mnt/l/archive/games/steam"] },
//!   "apps": {
//!     "Steam": { "install-path": "C:\\Program Files (x86)\\Steam" },
//!     "CloneTool": { "strategy": ["rclone", "rsync", "copytree"] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::host::clone::DEFAULT_STRATEGY;

pub const CONFIG_ENV: &str = "STEAM_ARCHIVIST_CONFIG";

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Collections {
    #[serde(default)]
    pub archives: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub collections: Collections,

    /// Per-component overrides keyed by component name.
    #[serde(default)]
    pub apps: BTreeMap<String, Map<String, Value>>,

    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Where a clone strategy came from, for logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategySource {
    Default,
    File(PathBuf),
}

impl Settings {
    /// `$STEAM_ARCHIVIST_CONFIG`, else `<config dir>/steam-archivist/settings.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("steam-archivist")
            .join("settings.json")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let mut settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    /// Configured archive roots; the first one is the default archive.
    pub fn archive_roots(&self) -> &[String] {
        &self.collections.archives
    }

    pub fn app_config(&self, component: &str) -> Option<&Map<String, Value>> {
        self.apps.get(component)
    }

    pub fn steam_install_path(&self) -> Option<String> {
        self.app_config("Steam")?
            .get("install-path")?
            .as_str()
            .map(String::from)
    }

    /// Copy tool preference list.
    pub fn clone_strategy(&self) -> Result<(Vec<String>, StrategySource)> {
        let configured = self
            .app_config("CloneTool")
            .and_then(|cfg| cfg.get("strategy"));
        match configured {
            None => Ok((
                DEFAULT_STRATEGY.iter().map(|s| s.to_string()).collect(),
                StrategySource::Default,
            )),
            Some(value) => {
                let strategy: Vec<String> = serde_json::from_value(value.clone()).map_err(|e| {
                    Error::Config(format!("apps.CloneTool.strategy must be a list of names: {e}"))
                })?;
                let source = self
                    .source
                    .clone()
                    .map(StrategySource::File)
                    .unwrap_or(StrategySource::Default);
                Ok((strategy, source))
            }
        }
    }
}

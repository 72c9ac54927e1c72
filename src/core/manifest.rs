//! App manifests (`appmanifest_<id>.acf`).
//!
//! A manifest is Steam's record of one installed game. The same file is
//! copied verbatim into archives, so one type models both; only the way the
//! install directory is composed differs, see [`Layout`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use keyvalues_parser::{Value, Vdf};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::utils::fsutil;

/// How a collection lays out manifests and install data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<root>/steamapps/*.acf` with data under `<root>/steamapps/common/`.
    Library,
    /// Manifests and install directories side by side in the root.
    Archive,
}

/// Owned copy of a parsed key-value tree.
///
/// Comparing two of these compares the complete metadata of a manifest,
/// which is what decides whether an archived copy matches the live one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValue {
    Str(String),
    Obj(BTreeMap<String, Vec<KeyValue>>),
}

impl KeyValue {
    fn from_vdf(value: &Value<'_>) -> Self {
        match value {
            Value::Str(s) => KeyValue::Str(s.to_string()),
            Value::Obj(obj) => KeyValue::Obj(
                obj.iter()
                    .map(|(key, values)| {
                        (key.to_string(), values.iter().map(KeyValue::from_vdf).collect())
                    })
                    .collect(),
            ),
        }
    }

    pub fn get(&self, key: &str) -> Option<&KeyValue> {
        match self {
            KeyValue::Obj(obj) => obj.get(key).and_then(|values| values.first()),
            KeyValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::Str(s) => Some(s),
            KeyValue::Obj(_) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppManifest {
    path: PathBuf,
    layout: Layout,
    root_key: String,
    state: KeyValue,
    app_id: u32,
    install_dir: String,
}

impl AppManifest {
    /// Parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the file cannot be read or is not valid VDF.
    /// - [`Error::Schema`] if there is no numeric `appid`/`appID` field or
    ///   no `installdir`/`InstallDir` field.
    pub fn parse(path: &Path, layout: Layout) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_contents(path, &contents, layout)
    }

    pub(crate) fn from_contents(path: &Path, contents: &str, layout: Layout) -> Result<Self> {
        let vdf = Vdf::parse(contents).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let root_key = vdf.key.to_string();
        let state = KeyValue::from_vdf(&vdf.value);

        let schema = |message: &str| Error::Schema {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if !matches!(state, KeyValue::Obj(_)) {
            return Err(schema("AppState is not a section"));
        }

        let raw_id = state
            .get("appID")
            .or_else(|| state.get("appid"))
            .and_then(KeyValue::as_str)
            .ok_or_else(|| schema("missing appid"))?;
        let app_id = raw_id
            .trim()
            .parse::<u32>()
            .map_err(|_| schema(&format!("appid is not a number: {raw_id}")))?;

        let install_dir = state
            .get("installdir")
            .or_else(|| state.get("InstallDir"))
            .and_then(KeyValue::as_str)
            .ok_or_else(|| schema("missing installdir"))?
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            layout,
            root_key,
            state,
            app_id,
            install_dir,
        })
    }

    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    /// Display name: `name`, then `UserConfig.name`, then the install
    /// directory's basename.
    pub fn name(&self) -> String {
        if let Some(name) = self.state.get("name").and_then(KeyValue::as_str) {
            return name.to_string();
        }
        if let Some(name) = self
            .state
            .get("UserConfig")
            .and_then(|cfg| cfg.get("name"))
            .and_then(KeyValue::as_str)
        {
            return name.to_string();
        }
        self.install_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.install_dir.clone())
    }

    /// Size Steam recorded for the game. Missing or unparsable values read
    /// as zero, which downstream checks treat as "unknown".
    pub fn size(&self) -> u64 {
        self.state
            .get("SizeOnDisk")
            .and_then(KeyValue::as_str)
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw `installdir` value.
    pub fn install_dir(&self) -> &str {
        &self.install_dir
    }

    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }

    fn manifest_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn install_path(&self) -> PathBuf {
        match self.layout {
            Layout::Library => self.manifest_dir().join("common").join(&self.install_dir),
            Layout::Archive => self.manifest_dir().join(&self.install_dir),
        }
    }

    /// Where this game's data lives when the manifest sits in an archive.
    ///
    /// Always `dirname(manifest)/<installdir>`: for library manifests this
    /// drops the `common` segment, for archive manifests it equals
    /// [`install_path`](Self::install_path).
    pub fn archived_install_path(&self) -> PathBuf {
        self.manifest_dir().join(&self.install_dir)
    }

    /// True when `installdir` is exactly one relative path segment.
    pub fn has_relative_install_dir(&self) -> bool {
        let normalized = self.install_dir.replace('\\', "/");
        let mut components = Path::new(&normalized)
            .components()
            .filter(|c| !matches!(c, Component::CurDir));
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    }

    /// Fails with [`Error::Precondition`] unless `installdir` is a single
    /// relative segment. Anything touching the install directory on disk
    /// calls this first.
    pub fn ensure_relative_install_dir(&self) -> Result<()> {
        if self.has_relative_install_dir() {
            Ok(())
        } else {
            Err(Error::Precondition(format!(
                "install directory {:?} of {} is not a single path segment",
                self.install_dir,
                self.name()
            )))
        }
    }

    pub fn store_url(&self) -> String {
        format!("https://store.steampowered.com/app/{}", self.app_id)
    }

    pub fn img_url(&self) -> String {
        format!(
            "https://cdn.cloudflare.steamstatic.com/steam/apps/{}/header.jpg",
            self.app_id
        )
    }

    /// Bytes actually used by the install directory.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the install directory does not exist.
    pub fn size_on_disk(&self) -> Result<u64> {
        fsutil::directory_size(&self.install_path())
    }

    /// Declared size minus on-disk size. Positive means the manifest
    /// overstates what is on disk.
    pub fn size_delta(&self) -> Result<i64> {
        Ok(self.size() as i64 - self.size_on_disk()? as i64)
    }
}

impl PartialEq for AppManifest {
    fn eq(&self, other: &Self) -> bool {
        self.root_key == other.root_key && self.state == other.state
    }
}

impl Eq for AppManifest {}

#[derive(Serialize)]
struct GameRecord {
    id: u32,
    name: String,
    manifest_path: PathBuf,
    install_path: PathBuf,
    size: u64,
    store_url: String,
    img_url: String,
}

impl Serialize for AppManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        GameRecord {
            id: self.app_id,
            name: self.name(),
            manifest_path: self.path.clone(),
            install_path: self.install_path(),
            size: self.size(),
            store_url: self.store_url(),
            img_url: self.img_url(),
        }
        .serialize(serializer)
    }
}

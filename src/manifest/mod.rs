use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collector::ChecksumEntry;
use crate::config::ManifestDefaults;
use crate::error::{PackError, Result};

pub mod reconcile;

pub use reconcile::{merge, reconcile, reset};

/// One downloadable artifact as the updater sees it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestFileEntry {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_folder: Option<bool>,
    /// Hand-written fields this tool does not own.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_required() -> bool {
    true
}

impl From<&ChecksumEntry> for ManifestFileEntry {
    fn from(entry: &ChecksumEntry) -> Self {
        Self {
            hash: entry.hash.clone(),
            size: entry.size,
            url: entry.url.clone(),
            required: entry.required,
            is_folder: Some(entry.is_folder()),
            extra: Map::new(),
        }
    }
}

/// The `version.json` document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub min_required_version: String,
    #[serde(default)]
    pub changelog: String,
    #[serde(default)]
    pub update_server: String,
    #[serde(default)]
    pub download_base_url: String,
    #[serde(default)]
    pub changelog_url: String,
    #[serde(default)]
    pub files: IndexMap<String, ManifestFileEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// A fresh manifest with no files, stamped with today's date.
    pub fn with_defaults(defaults: &ManifestDefaults) -> Self {
        Self {
            version: defaults.version.clone(),
            build_date: today(),
            min_required_version: defaults.min_required_version.clone(),
            changelog: defaults.changelog.clone(),
            update_server: defaults.update_server.clone(),
            download_base_url: defaults.download_base_url.clone(),
            changelog_url: defaults.changelog_url.clone(),
            files: IndexMap::new(),
            extra: Map::new(),
        }
    }

    /// Fill root fields left empty by an older or hand-trimmed manifest.
    ///
    /// Fields that already carry a value are never overwritten.
    pub fn fill_missing(&mut self, defaults: &ManifestDefaults) {
        for (field, default) in [
            (&mut self.version, &defaults.version),
            (&mut self.min_required_version, &defaults.min_required_version),
            (&mut self.changelog, &defaults.changelog),
            (&mut self.update_server, &defaults.update_server),
            (&mut self.download_base_url, &defaults.download_base_url),
            (&mut self.changelog_url, &defaults.changelog_url),
        ] {
            if field.is_empty() {
                field.clone_from(default);
            }
        }
    }

    pub fn stamp_build_date(&mut self) {
        self.build_date = today();
    }
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Read and parse the manifest. `Ok(None)` means there is none yet.
pub fn load(path: &Path) -> Result<Option<Manifest>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(PackError::ManifestLoad {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PackError::ManifestLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// The existing manifest, or a default one when it is missing or unreadable.
///
/// Empty root fields of an existing manifest are taken from `defaults`.
pub fn load_or_default(path: &Path, defaults: &ManifestDefaults) -> Manifest {
    match load(path) {
        Ok(Some(mut manifest)) => {
            debug!(
                "manifest: loaded {} with {} files",
                path.display(),
                manifest.files.len()
            );
            manifest.fill_missing(defaults);
            manifest
        }
        Ok(None) => {
            info!("manifest: {} not found, starting from defaults", path.display());
            Manifest::with_defaults(defaults)
        }
        Err(err) => {
            warn!("manifest: {err}; starting from defaults");
            Manifest::with_defaults(defaults)
        }
    }
}

/// Rewrite the whole manifest as pretty-printed JSON.
pub fn save(manifest: &Manifest, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(manifest).map_err(|e| PackError::ManifestWrite {
        path: path.to_path_buf(),
        message: format!("failed to serialize manifest: {e}"),
    })?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| PackError::ManifestWrite {
            path: path.to_path_buf(),
            message: format!("failed to create manifest dir: {e}"),
        })?;
    }
    fs::write(path, bytes).map_err(|e| PackError::ManifestWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!(
        "manifest: wrote {} ({} files)",
        path.display(),
        manifest.files.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ManifestDefaults {
        ManifestDefaults {
            version: "1.01.03".into(),
            download_base_url: "https://cdn.example.com".into(),
            ..ManifestDefaults::default()
        }
    }

    #[test]
    fn missing_manifest_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("version.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_manifest_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load(&path), Err(PackError::ManifestLoad { .. })));
        let manifest = load_or_default(&path, &defaults());
        assert_eq!(manifest.version, "1.01.03");
        assert_eq!(manifest.download_base_url, "https://cdn.example.com");
        assert!(manifest.files.is_empty());
        assert_eq!(manifest.build_date.len(), 10);
    }

    #[test]
    fn loaded_manifest_gets_missing_root_fields_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        fs::write(
            &path,
            r#"{"version": "0.9", "changelog": "", "files": {"a.bin": {"hash": "aa"}}}"#,
        )
        .unwrap();

        let manifest = load_or_default(&path, &defaults());
        assert_eq!(manifest.version, "0.9");
        assert_eq!(manifest.download_base_url, "https://cdn.example.com");
        assert_eq!(manifest.changelog, "");
        assert_eq!(manifest.files.len(), 1);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        fs::write(
            &path,
            r#"{
                "version": "1.0",
                "channel": "beta",
                "files": {
                    "launcher.exe": {"hash": "aa", "size": 3, "url": "u", "note": "keep me"}
                }
            }"#,
        )
        .unwrap();

        let manifest = load(&path).unwrap().unwrap();
        assert_eq!(manifest.extra["channel"], "beta");
        let entry = &manifest.files["launcher.exe"];
        assert!(entry.required);
        assert_eq!(entry.is_folder, None);
        assert_eq!(entry.extra["note"], "keep me");

        save(&manifest, &path).unwrap();
        let value: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["channel"], "beta");
        assert_eq!(value["files"]["launcher.exe"]["note"], "keep me");
        assert!(value["files"]["launcher.exe"].get("is_folder").is_none());
    }

    #[test]
    fn save_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("version.json");
        let mut manifest = Manifest::with_defaults(&defaults());
        for key in ["zeta.bin", "alpha.bin", "mods"] {
            manifest.files.insert(
                key.into(),
                ManifestFileEntry {
                    hash: String::new(),
                    size: 0,
                    url: String::new(),
                    required: true,
                    is_folder: None,
                    extra: Map::new(),
                },
            );
        }
        save(&manifest, &path).unwrap();

        let reloaded = load(&path).unwrap().unwrap();
        let keys: Vec<&str> = reloaded.files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta.bin", "alpha.bin", "mods"]);
    }

    #[test]
    fn unwritable_path_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not dir").unwrap();
        let manifest = Manifest::with_defaults(&defaults());

        let err = save(&manifest, &blocker.join("version.json")).unwrap_err();
        assert!(matches!(err, PackError::ManifestWrite { .. }));
    }
}

use std::fmt;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};

/// Name of the configuration file looked up in the working root.
pub const LOCAL_CONFIG: &str = "packager.json";
const EMBEDDED_CONFIG: &str = include_str!("../../packager.json");

/// How tracked folders end up in the checksum mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollectMode {
    /// One digest over the concatenated bytes of every file in the folder.
    RawFolderHash,
    /// The raw folder digest plus an entry for every file inside it.
    PerFileManifest,
    /// The folder is zipped and the archive is what gets hashed and shipped.
    ZipFolder,
}

impl fmt::Display for CollectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RawFolderHash => "raw-folder-hash",
            Self::PerFileManifest => "per-file-manifest",
            Self::ZipFolder => "zip-folder",
        })
    }
}

/// What happens to the manifest's existing `files` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileStrategy {
    /// Update matching entries in place and append new ones.
    Merge,
    /// Rebuild the table from this run's checksums only.
    Reset,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Merge => "merge",
            Self::Reset => "reset",
        })
    }
}

/// Values used when no manifest exists yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestDefaults {
    pub version: String,
    pub min_required_version: String,
    pub changelog: String,
    pub update_server: String,
    pub download_base_url: String,
    pub changelog_url: String,
}

impl Default for ManifestDefaults {
    fn default() -> Self {
        Self {
            version: "1.0.0".into(),
            min_required_version: "1.0.0".into(),
            changelog: String::new(),
            update_server: String::new(),
            download_base_url: String::new(),
            changelog_url: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    pub tracked_files: Vec<String>,
    pub tracked_folders: Vec<String>,
    /// Logical names shipped with `required: false`.
    pub optional_paths: Vec<String>,
    pub mode: CollectMode,
    pub strategy: ReconcileStrategy,
    /// Leave generated archives in place for upload.
    pub keep_archives: bool,
    pub manifest_file: String,
    pub report_file: String,
    pub defaults: ManifestDefaults,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            tracked_files: Vec::new(),
            tracked_folders: Vec::new(),
            optional_paths: Vec::new(),
            mode: CollectMode::ZipFolder,
            strategy: ReconcileStrategy::Reset,
            keep_archives: true,
            manifest_file: "version.json".into(),
            report_file: "checksums.json".into(),
            defaults: ManifestDefaults::default(),
        }
    }
}

impl PackagerConfig {
    /// The configuration compiled into the binary.
    pub fn embedded() -> Result<Self> {
        parse(EMBEDDED_CONFIG, Path::new("<embedded packager.json>"))
    }

    /// Read an explicitly requested config file; any failure is fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| PackError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse(&contents, path)
    }

    /// `packager.json` from `root` when present, otherwise the embedded copy.
    pub fn discover(root: &Path) -> Result<Self> {
        let local = root.join(LOCAL_CONFIG);
        if local.is_file() {
            debug!("config: using {}", local.display());
            return Self::from_file(&local);
        }
        warn!(
            "config: {} not found in {}, using embedded copy",
            LOCAL_CONFIG,
            root.display()
        );
        Self::embedded()
    }

    #[must_use]
    pub fn is_required(&self, logical_name: &str) -> bool {
        !self.optional_paths.iter().any(|p| p == logical_name)
    }
}

fn parse(contents: &str, origin: &Path) -> Result<PackagerConfig> {
    serde_json::from_str(contents).map_err(|e| PackError::Config {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::archiver;
use crate::config::{CollectMode, PackagerConfig};
use crate::error::{PackError, Result};
use crate::hasher::{self, FolderDigest};
use crate::util;
use crate::validator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One hashed artifact. Only ever built from a successful read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub logical_name: String,
    pub hash: String,
    pub size: u64,
    pub kind: EntryKind,
    pub archive_name: Option<String>,
    pub required: bool,
    pub url: String,
}

impl ChecksumEntry {
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Logical name to entry, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChecksumMapping {
    entries: IndexMap<String, ChecksumEntry>,
}

impl ChecksumMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ChecksumEntry) {
        self.entries.insert(entry.logical_name.clone(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&ChecksumEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecksumEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<ChecksumEntry> for ChecksumMapping {
    fn from_iter<I: IntoIterator<Item = ChecksumEntry>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for entry in iter {
            mapping.insert(entry);
        }
        mapping
    }
}

/// A tracked path (or a file inside one) that did not make it into the mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skipped {
    pub path: String,
    pub reason: String,
}

/// Everything one collection pass produced.
#[derive(Clone, Debug, Default)]
pub struct Collection {
    pub mapping: ChecksumMapping,
    pub skipped: Vec<Skipped>,
    /// Archives written to the archive directory, for cleanup.
    pub archives: Vec<PathBuf>,
}

impl Collection {
    fn skip(&mut self, path: impl Into<String>, reason: impl ToString) {
        let path = path.into();
        let reason = reason.to_string();
        warn!("collector: skipping {}: {}", path, reason);
        self.skipped.push(Skipped { path, reason });
    }
}

#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    pub position: usize,
    pub total: usize,
    pub current: String,
}

pub type ProgressCallback<'a> = Option<&'a mut dyn FnMut(ProgressUpdate)>;

fn emit_progress(cb: &mut ProgressCallback<'_>, update: ProgressUpdate) {
    if let Some(callback) = cb.as_deref_mut() {
        callback(update);
    }
}

/// Hash every tracked file, then every tracked folder, in configured order.
///
/// Archives are written to `archive_dir`. Missing or unreadable paths are
/// skipped; nothing here fails the run.
pub fn collect(
    root: &Path,
    archive_dir: &Path,
    config: &PackagerConfig,
    mut progress: ProgressCallback<'_>,
) -> Collection {
    let mut collector = Collector {
        root,
        archive_dir,
        base_url: config.defaults.download_base_url.as_str(),
        mode: config.mode,
        archive_owners: HashMap::new(),
        collection: Collection::default(),
    };
    let total = config.tracked_files.len() + config.tracked_folders.len();
    info!(
        "collector: {} files, {} folders in {} mode",
        config.tracked_files.len(),
        config.tracked_folders.len(),
        config.mode
    );

    let tracked = config
        .tracked_files
        .iter()
        .map(|name| (name, EntryKind::File))
        .chain(
            config
                .tracked_folders
                .iter()
                .map(|name| (name, EntryKind::Folder)),
        );
    for (index, (name, kind)) in tracked.enumerate() {
        emit_progress(
            &mut progress,
            ProgressUpdate {
                position: index,
                total,
                current: name.clone(),
            },
        );
        let required = config.is_required(name);
        match kind {
            EntryKind::File => collector.file(name, required),
            EntryKind::Folder => collector.folder(name, required),
        }
    }
    emit_progress(
        &mut progress,
        ProgressUpdate {
            position: total,
            total,
            current: String::new(),
        },
    );

    let collection = collector.collection;
    info!(
        "collector: {} entries, {} skipped",
        collection.mapping.len(),
        collection.skipped.len()
    );
    collection
}

struct Collector<'a> {
    root: &'a Path,
    archive_dir: &'a Path,
    base_url: &'a str,
    mode: CollectMode,
    /// Archive file name to the tracked folder that produced it this run.
    archive_owners: HashMap<String, String>,
    collection: Collection,
}

impl Collector<'_> {
    fn file(&mut self, name: &str, required: bool) {
        let path = self.root.join(name);
        if !path.exists() {
            self.collection.skip(name, "not found");
            return;
        }
        if !path.is_file() {
            self.collection.skip(name, "not a file");
            return;
        }
        if let Err(err) = check_name(&path) {
            self.collection.skip(name, err);
            return;
        }
        match hasher::hash_file(&path) {
            Ok((hash, size)) => {
                debug!(
                    "collector: {}: {}... ({})",
                    name,
                    util::short_hash(&hash),
                    util::format_size(size)
                );
                self.collection.mapping.insert(ChecksumEntry {
                    logical_name: name.to_owned(),
                    hash,
                    size,
                    kind: EntryKind::File,
                    archive_name: None,
                    required,
                    url: download_url(self.base_url, name, EntryKind::File, None),
                });
            }
            Err(err) => self.collection.skip(name, err),
        }
    }

    fn folder(&mut self, name: &str, required: bool) {
        let path = self.root.join(name);
        let label = format!("{name}/");
        if !path.exists() {
            self.collection.skip(label, "not found");
            return;
        }
        if !path.is_dir() {
            self.collection.skip(label, "not a directory");
            return;
        }
        if let Err(err) = check_name(&path) {
            self.collection.skip(label, err);
            return;
        }

        if self.mode == CollectMode::ZipFolder {
            self.zipped_folder(name, &path, required);
        } else {
            self.raw_folder(name, &path, required);
        }
    }

    fn zipped_folder(&mut self, name: &str, path: &Path, required: bool) {
        let label = format!("{name}/");
        let Some(archive_name) = archiver::archive_name_for(path) else {
            self.collection
                .skip(label, PackError::archive(path, "folder has no name"));
            return;
        };
        if let Some(owner) = self.archive_owners.get(&archive_name) {
            let err = PackError::archive(
                path,
                format!("{archive_name} is already produced by {owner}/"),
            );
            self.collection.skip(label, err);
            return;
        }

        match archiver::archive_folder(path, self.archive_dir) {
            Ok(archive) => {
                self.archive_owners
                    .insert(archive.file_name.clone(), name.to_owned());
                for rel in &archive.skipped {
                    self.collection.skipped.push(Skipped {
                        path: format!("{name}/{rel}"),
                        reason: "illegal file name".into(),
                    });
                }
                self.collection.archives.push(archive.path.clone());
                let url = download_url(
                    self.base_url,
                    name,
                    EntryKind::Folder,
                    Some(&archive.file_name),
                );
                self.collection.mapping.insert(ChecksumEntry {
                    logical_name: name.to_owned(),
                    hash: archive.hash,
                    size: archive.size,
                    kind: EntryKind::Folder,
                    archive_name: Some(archive.file_name),
                    required,
                    url,
                });
            }
            Err(err) => self.collection.skip(label, err),
        }
    }

    fn raw_folder(&mut self, name: &str, path: &Path, required: bool) {
        let label = format!("{name}/");
        let scan = match util::scan_members(path) {
            Ok(scan) => scan,
            Err(err) => {
                self.collection.skip(label, err);
                return;
            }
        };
        for (rel, reason) in &scan.rejected {
            self.collection.skipped.push(Skipped {
                path: format!("{name}/{rel}"),
                reason: (*reason).to_owned(),
            });
        }

        let mut digest = FolderDigest::new();
        let mut per_file = Vec::new();
        for member in &scan.accepted {
            let read = if self.mode == CollectMode::PerFileManifest {
                digest.append_member(&member.path).map(|(hash, size)| {
                    let key = format!("{name}/{}", member.relative);
                    per_file.push(ChecksumEntry {
                        url: download_url(self.base_url, &key, EntryKind::File, None),
                        logical_name: key,
                        hash,
                        size,
                        kind: EntryKind::File,
                        archive_name: None,
                        required,
                    });
                })
            } else {
                digest.append_file(&member.path).map(|_| ())
            };
            if let Err(err) = read {
                self.collection.skip(label, err);
                return;
            }
        }

        let (hash, size) = digest.finish();
        debug!(
            "collector: {}/: {}... ({} files, {})",
            name,
            util::short_hash(&hash),
            scan.accepted.len(),
            util::format_size(size)
        );
        self.collection.mapping.insert(ChecksumEntry {
            logical_name: name.to_owned(),
            hash,
            size,
            kind: EntryKind::Folder,
            archive_name: None,
            required,
            url: download_url(self.base_url, name, EntryKind::Folder, None),
        });
        for entry in per_file {
            self.collection.mapping.insert(entry);
        }
    }
}

fn check_name(path: &Path) -> Result<()> {
    let bare = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match validator::rejection_reason(&bare) {
        Some(reason) => Err(PackError::InvalidName { name: bare, reason }),
        None => Ok(()),
    }
}

/// Where the updater fetches an entry from.
///
/// Archived folders point at their archive, other folders get a trailing `/`.
#[must_use]
pub fn download_url(base: &str, key: &str, kind: EntryKind, archive: Option<&str>) -> String {
    let target = match (kind, archive) {
        (EntryKind::Folder, Some(archive)) => archive.to_owned(),
        (EntryKind::Folder, None) => format!("{}/", key.trim_end_matches('/')),
        (EntryKind::File, _) => key.to_owned(),
    };
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        target
    } else {
        format!("{base}/{target}")
    }
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    hash: &'a str,
    size: u64,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive: Option<&'a str>,
}

/// Dump the mapping as `checksums.json`-style JSON for inspection.
pub fn write_report(mapping: &ChecksumMapping, path: &Path) -> Result<()> {
    let report: IndexMap<&str, ReportEntry<'_>> = mapping
        .iter()
        .map(|entry| {
            (
                entry.logical_name.as_str(),
                ReportEntry {
                    hash: &entry.hash,
                    size: entry.size,
                    kind: entry.kind,
                    archive: entry.archive_name.as_deref(),
                },
            )
        })
        .collect();
    let bytes = serde_json::to_vec_pretty(&report).map_err(|e| PackError::Report {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, bytes).map_err(|e| PackError::Report {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("collector: report written to {}", path.display());
    Ok(())
}

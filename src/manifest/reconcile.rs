//! Folding a fresh checksum mapping into the manifest's `files` table.
//!
//! Merge only ever drops the `"name/"` duplicate of a key that is present
//! without the slash; entries for folders that were renamed or removed stay
//! in the table until someone deletes them by hand.

use log::{debug, info};

use super::{Manifest, ManifestFileEntry};
use crate::collector::ChecksumMapping;
use crate::config::ReconcileStrategy;

/// What a reconciliation changed, for the run summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: usize,
    pub added: usize,
    pub removed: Vec<String>,
}

pub fn reconcile(
    manifest: &mut Manifest,
    mapping: &ChecksumMapping,
    strategy: ReconcileStrategy,
) -> ReconcileReport {
    let report = match strategy {
        ReconcileStrategy::Merge => merge(manifest, mapping),
        ReconcileStrategy::Reset => reset(manifest, mapping),
    };
    info!(
        "reconcile ({}): {} updated, {} added, {} removed",
        strategy,
        report.updated,
        report.added,
        report.removed.len()
    );
    report
}

/// Refresh `hash`, `size` and `is_folder` of known entries and append new ones.
///
/// Any other field on an existing entry, including a hand-edited `url`, is kept.
pub fn merge(manifest: &mut Manifest, mapping: &ChecksumMapping) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for entry in mapping.iter() {
        let key = entry.logical_name.as_str();
        if !key.ends_with('/') {
            let stale = format!("{key}/");
            if manifest.files.shift_remove(&stale).is_some() {
                debug!("reconcile: dropped stale entry {stale:?}");
                report.removed.push(stale);
            }
        }

        match manifest.files.get_mut(key) {
            Some(existing) => {
                existing.hash.clone_from(&entry.hash);
                existing.size = entry.size;
                existing.is_folder = Some(entry.is_folder());
                report.updated += 1;
            }
            None => {
                manifest
                    .files
                    .insert(key.to_owned(), ManifestFileEntry::from(entry));
                report.added += 1;
            }
        }
    }
    report
}

/// Replace the table with exactly the entries of `mapping`.
pub fn reset(manifest: &mut Manifest, mapping: &ChecksumMapping) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for key in manifest.files.keys() {
        if mapping.contains(key) {
            report.updated += 1;
        } else {
            report.removed.push(key.clone());
        }
    }
    report.added = mapping.len() - report.updated;

    manifest.files = mapping
        .iter()
        .map(|entry| {
            (
                entry.logical_name.clone(),
                ManifestFileEntry::from(entry),
            )
        })
        .collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ChecksumEntry, EntryKind};
    use crate::config::ManifestDefaults;
    use serde_json::{Map, Value};

    fn entry(name: &str, hash: &str, kind: EntryKind) -> ChecksumEntry {
        ChecksumEntry {
            logical_name: name.into(),
            hash: hash.into(),
            size: 42,
            kind,
            archive_name: None,
            required: true,
            url: format!("https://cdn.example.com/{name}"),
        }
    }

    fn manifest_with(entries: &[(&str, &str)]) -> Manifest {
        let mut manifest = Manifest::with_defaults(&ManifestDefaults::default());
        for (key, hash) in entries {
            manifest.files.insert(
                (*key).into(),
                ManifestFileEntry {
                    hash: (*hash).into(),
                    size: 1,
                    url: format!("https://mirror.example.com/{key}"),
                    required: false,
                    is_folder: None,
                    extra: Map::new(),
                },
            );
        }
        manifest
    }

    fn with_note(mut manifest: Manifest, key: &str) -> Manifest {
        manifest
            .files
            .get_mut(key)
            .unwrap()
            .extra
            .insert("note".into(), Value::from("keep me"));
        manifest
    }

    #[test]
    fn merge_keeps_hand_written_fields() {
        let mut manifest = with_note(manifest_with(&[("X", "old")]), "X");
        let mapping: ChecksumMapping = [entry("X", "new", EntryKind::File)].into_iter().collect();

        let report = merge(&mut manifest, &mapping);

        let x = &manifest.files["X"];
        assert_eq!(x.hash, "new");
        assert_eq!(x.size, 42);
        assert_eq!(x.is_folder, Some(false));
        assert_eq!(x.extra["note"], "keep me");
        assert_eq!(x.url, "https://mirror.example.com/X");
        assert!(!x.required);
        assert_eq!(report.updated, 1);
        assert_eq!(report.added, 0);
    }

    #[test]
    fn merge_appends_new_entries_and_leaves_others() {
        let mut manifest = manifest_with(&[("orphan.bin", "o"), ("X", "old")]);
        let mapping: ChecksumMapping = [
            entry("X", "new", EntryKind::File),
            entry("mods", "m", EntryKind::Folder),
        ]
        .into_iter()
        .collect();

        let report = merge(&mut manifest, &mapping);

        let keys: Vec<&str> = manifest.files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["orphan.bin", "X", "mods"]);
        let mods = &manifest.files["mods"];
        assert_eq!(mods.url, "https://cdn.example.com/mods");
        assert_eq!(mods.is_folder, Some(true));
        assert!(mods.required);
        assert_eq!(report.added, 1);
        assert!(report.removed.is_empty());
    }

    #[test]
    fn merge_drops_trailing_slash_duplicates() {
        let mut manifest = manifest_with(&[("mods/", "old"), ("update.exe", "u")]);
        let mapping: ChecksumMapping = [entry("mods", "m", EntryKind::Folder)].into_iter().collect();

        let report = merge(&mut manifest, &mapping);

        assert!(manifest.files.contains_key("mods"));
        assert!(!manifest.files.contains_key("mods/"));
        assert!(manifest.files.contains_key("update.exe"));
        assert_eq!(report.removed, vec!["mods/".to_owned()]);
    }

    #[test]
    fn reset_discards_out_of_band_edits() {
        let mut manifest = with_note(manifest_with(&[("X", "old"), ("orphan.bin", "o")]), "X");
        let mapping: ChecksumMapping = [
            entry("X", "new", EntryKind::File),
            entry("mods", "m", EntryKind::Folder),
        ]
        .into_iter()
        .collect();

        let report = reset(&mut manifest, &mapping);

        let keys: Vec<&str> = manifest.files.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["X", "mods"]);
        let x = &manifest.files["X"];
        assert_eq!(x.hash, "new");
        assert!(x.extra.get("note").is_none());
        assert_eq!(x.url, "https://cdn.example.com/X");
        assert_eq!(report.updated, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, vec!["orphan.bin".to_owned()]);
    }

    #[test]
    fn reconcile_dispatches_on_strategy() {
        let mapping: ChecksumMapping = [entry("X", "new", EntryKind::File)].into_iter().collect();

        let mut merged = manifest_with(&[("keep.bin", "k")]);
        reconcile(&mut merged, &mapping, ReconcileStrategy::Merge);
        assert_eq!(merged.files.len(), 2);

        let mut reset_manifest = manifest_with(&[("keep.bin", "k")]);
        reconcile(&mut reset_manifest, &mapping, ReconcileStrategy::Reset);
        assert_eq!(reset_manifest.files.len(), 1);
    }
}

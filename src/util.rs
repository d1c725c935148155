use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use log::warn;
use walkdir::{DirEntry, WalkDir};

use crate::error::{PackError, Result};
use crate::validator;

/// A regular file found under a tracked folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub path: PathBuf,
    /// Path relative to the folder root, always `/`-separated.
    pub relative: String,
}

/// Result of scanning a folder: files that may be packaged and files skipped for their name.
#[derive(Clone, Debug, Default)]
pub struct MemberScan {
    pub accepted: Vec<Member>,
    pub rejected: Vec<(String, &'static str)>,
}

/// List every regular file below `root` in a reproducible order.
///
/// At each level the files come first, then the subdirectories, each group
/// sorted by name, and a subdirectory is fully visited before its next sibling.
pub fn sorted_members(root: &Path) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(files_then_dirs);
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PackError::read(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_name(root, entry.path());
        members.push(Member {
            path: entry.into_path(),
            relative,
        });
    }
    Ok(members)
}

/// [`sorted_members`] with every file whose name the validator refuses moved aside.
pub fn scan_members(root: &Path) -> Result<MemberScan> {
    let mut scan = MemberScan::default();
    for member in sorted_members(root)? {
        let name = member
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match validator::rejection_reason(&name) {
            Some(reason) => {
                warn!("skipping {}: {}", member.relative, reason);
                scan.rejected.push((member.relative, reason));
            }
            None => scan.accepted.push(member),
        }
    }
    Ok(scan)
}

fn files_then_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// `path` relative to `root` with `/` separators, whatever the host uses.
#[must_use]
pub fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Render a byte count the way the console summary shows it.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value < KIB {
        format!("{bytes} B")
    } else if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else {
        format!("{:.1} MB", value / MIB)
    }
}

/// First sixteen hex characters of a digest, for log lines.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

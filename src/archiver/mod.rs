use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{PackError, Result};
use crate::hasher;
use crate::util;

/// An archive written for one tracked folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderArchive {
    pub file_name: String,
    pub path: PathBuf,
    pub hash: String,
    pub size: u64,
    pub members: usize,
    /// Files left out because of their name, relative to the folder root.
    pub skipped: Vec<String>,
}

/// `<folder>.zip`, with anything that is not safe in a download URL replaced by `_`.
#[must_use]
pub fn archive_file_name(folder: &str) -> String {
    let trimmed = folder.trim_end_matches(['/', '\\']);
    let sanitized: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitized}.zip")
}

/// Archive name for a folder path, from its last component.
#[must_use]
pub fn archive_name_for(folder: &Path) -> Option<String> {
    folder
        .file_name()
        .map(|n| archive_file_name(&n.to_string_lossy()))
}

/// Deflate every acceptable file under `folder` into `out_dir/<folder>.zip`.
///
/// Member order, timestamps and permissions are fixed so that an unchanged
/// folder always yields the same archive bytes.
pub fn archive_folder(folder: &Path, out_dir: &Path) -> Result<FolderArchive> {
    let file_name = archive_name_for(folder)
        .ok_or_else(|| PackError::archive(folder, "folder has no name"))?;
    let dest = out_dir.join(&file_name);

    let scan =
        util::scan_members(folder).map_err(|e| PackError::archive(folder, e.to_string()))?;
    info!(
        "archiver: packing {} ({} files) into {}",
        folder.display(),
        scan.accepted.len(),
        dest.display()
    );

    if let Err(err) = write_archive(&dest, &scan.accepted) {
        let _ = fs::remove_file(&dest);
        return Err(PackError::archive(folder, err));
    }

    let (hash, size) = hasher::hash_file(&dest)?;
    debug!(
        "archiver: {} -> {} ({} bytes)",
        file_name,
        util::short_hash(&hash),
        size
    );

    Ok(FolderArchive {
        file_name,
        path: dest,
        hash,
        size,
        members: scan.accepted.len(),
        skipped: scan.rejected.into_iter().map(|(rel, _)| rel).collect(),
    })
}

fn write_archive(dest: &Path, members: &[util::Member]) -> std::result::Result<(), String> {
    let file = fs::File::create(dest).map_err(|e| format!("zip create error: {e}"))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    for member in members {
        let mut source = fs::File::open(&member.path)
            .map_err(|e| format!("open {} error: {e}", member.path.display()))?;
        zip.start_file(member.relative.as_str(), options)
            .map_err(|e| format!("zip entry {} error: {e}", member.relative))?;
        io::copy(&mut source, &mut zip)
            .map_err(|e| format!("zip write {} error: {e}", member.relative))?;
    }

    zip.finish()
        .map_err(|e| format!("zip finalize error: {e}"))?;
    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::PackError;

/// Delete generated archives unless they are meant to stay for upload.
///
/// Returns the failures; a file that is already gone is not one.
pub fn remove_archives(archives: &[PathBuf], keep_archives: bool) -> Vec<PackError> {
    if keep_archives {
        info!("cleanup: keeping {} archives for upload", archives.len());
        return Vec::new();
    }
    archives
        .iter()
        .filter_map(|path| remove_archive(path).err())
        .collect()
}

fn remove_archive(path: &Path) -> Result<(), PackError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("cleanup: removed {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            warn!("cleanup: could not remove {}: {}", path.display(), err);
            Err(PackError::Cleanup {
                path: path.to_path_buf(),
                source: err,
            })
        }
    }
}

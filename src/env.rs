use std::env;
use std::path::{Path, PathBuf};

use crate::config::PackagerConfig;

/// Working root for a run: the given directory, or the process's current one.
pub fn work_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

pub fn manifest_path(root: &Path, config: &PackagerConfig) -> PathBuf {
    root.join(&config.manifest_file)
}

pub fn report_path(root: &Path, config: &PackagerConfig) -> PathBuf {
    root.join(&config.report_file)
}

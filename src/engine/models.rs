use std::path::PathBuf;

use crate::collector::Skipped;
use crate::manifest::reconcile::ReconcileReport;

/// Per-invocation switches that are not part of the packaging config.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overwrites the manifest's `version` field.
    pub release_version: Option<String>,
    /// Collect and report only; the manifest is left alone.
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub files: usize,
    pub folders: usize,
    pub total_bytes: u64,
    pub skipped: Vec<Skipped>,
    /// Archives still on disk after cleanup.
    pub archives: Vec<PathBuf>,
    pub report_path: PathBuf,
    /// `None` on a dry run.
    pub manifest_path: Option<PathBuf>,
    pub reconcile: Option<ReconcileReport>,
}

impl RunSummary {
    pub fn entries(&self) -> usize {
        self.files + self.folders
    }
}

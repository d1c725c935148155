use std::path::PathBuf;

use log::{debug, info, warn};

use crate::cleanup;
use crate::collector::{self, ProgressCallback, Skipped};
use crate::config::PackagerConfig;
use crate::env;
use crate::error::{PackError, Result};
use crate::manifest;

pub mod models;

pub use models::{RunOptions, RunSummary};

/// Drives one packaging run over a working root.
pub struct PackagingEngine {
    root: PathBuf,
    config: PackagerConfig,
    options: RunOptions,
}

impl PackagingEngine {
    pub fn new(root: impl Into<PathBuf>, config: PackagerConfig, options: RunOptions) -> Self {
        Self {
            root: root.into(),
            config,
            options,
        }
    }

    /// Collect, write the side report, reconcile and persist the manifest, then clean up.
    ///
    /// Per-path problems end up in [`RunSummary::skipped`]; only failing to
    /// write the report or the manifest is returned as an error.
    ///
    /// A dry run builds its archives in a scratch directory, so archives
    /// already sitting in the root are never rebuilt or removed.
    pub fn run(&self, progress: ProgressCallback<'_>) -> Result<RunSummary> {
        info!(
            "engine: packaging {} (mode {}, strategy {})",
            self.root.display(),
            self.config.mode,
            self.config.strategy
        );
        let scratch = if self.options.dry_run {
            let dir = tempfile::Builder::new()
                .prefix("release-packager-")
                .tempdir()
                .map_err(|e| {
                    PackError::archive(&self.root, format!("failed to create scratch dir: {e}"))
                })?;
            debug!("engine: dry run archives go to {}", dir.path().display());
            Some(dir)
        } else {
            None
        };
        let archive_dir = scratch.as_ref().map_or(self.root.as_path(), |d| d.path());
        let collection = collector::collect(&self.root, archive_dir, &self.config, progress);

        let report_path = env::report_path(&self.root, &self.config);
        collector::write_report(&collection.mapping, &report_path)?;

        let mut summary = RunSummary {
            report_path,
            skipped: collection.skipped,
            ..RunSummary::default()
        };
        for entry in collection.mapping.iter() {
            if entry.is_folder() {
                summary.folders += 1;
            } else {
                summary.files += 1;
            }
            summary.total_bytes += entry.size;
        }

        if self.options.dry_run {
            info!("engine: dry run, manifest left untouched");
            return Ok(summary);
        }

        let manifest_path = env::manifest_path(&self.root, &self.config);
        let mut manifest = manifest::load_or_default(&manifest_path, &self.config.defaults);
        let report = manifest::reconcile(&mut manifest, &collection.mapping, self.config.strategy);
        if let Some(version) = &self.options.release_version {
            debug!("engine: manifest version {} -> {}", manifest.version, version);
            manifest.version.clone_from(version);
        }
        manifest.stamp_build_date();
        manifest::save(&manifest, &manifest_path)?;

        summary.manifest_path = Some(manifest_path);
        summary.reconcile = Some(report);
        self.cleanup(
            &collection.archives,
            self.config.keep_archives,
            &mut summary,
        );
        Ok(summary)
    }

    fn cleanup(&self, archives: &[PathBuf], keep: bool, summary: &mut RunSummary) {
        let failures = cleanup::remove_archives(archives, keep);
        if !failures.is_empty() {
            warn!("engine: {} archives could not be removed", failures.len());
        }
        summary.archives = archives.iter().filter(|p| p.exists()).cloned().collect();
        summary.skipped.extend(failures.into_iter().map(|err| Skipped {
            path: err
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            reason: err.to_string(),
        }));
    }
}

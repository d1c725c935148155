use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;

use release_packager::collector::ProgressUpdate;
use release_packager::config::{CollectMode, PackagerConfig, ReconcileStrategy};
use release_packager::util::format_size;
use release_packager::{PackagingEngine, RunOptions, RunSummary, env};

#[derive(Parser, Debug)]
#[command(
    name = "release-packager",
    author,
    version,
    about = "Hash, archive and publish launcher release files into version.json"
)]
struct Cli {
    /// Directory holding the tracked files and folders.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Packaging config; defaults to packager.json in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<CollectMode>,

    #[arg(long, value_enum)]
    strategy: Option<ReconcileStrategy>,

    /// Delete generated archives once the manifest is written.
    #[arg(long)]
    ephemeral_archives: bool,

    /// Version string to write into the manifest.
    #[arg(long)]
    release_version: Option<String>,

    /// Hash and report only; do not touch the manifest.
    #[arg(long)]
    dry_run: bool,

    /// Print packager version and exit.
    #[arg(long)]
    version_only: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("release-packager {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let root = env::work_dir(cli.dir.as_deref());
    let config = match &cli.config {
        Some(path) => PackagerConfig::from_file(path),
        None => PackagerConfig::discover(&root),
    };
    let mut config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if cli.ephemeral_archives {
        config.keep_archives = false;
    }

    let options = RunOptions {
        release_version: cli.release_version,
        dry_run: cli.dry_run,
    };
    let engine = PackagingEngine::new(root, config, options);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    let mut on_progress = |update: ProgressUpdate| {
        bar.set_length(update.total as u64);
        bar.set_position(update.position as u64);
        bar.set_message(update.current);
    };
    let result = engine.run(Some(&mut on_progress));
    bar.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "=".repeat(50));
    println!(
        "Processed {} entries ({} files, {} folders, {})",
        summary.entries(),
        summary.files,
        summary.folders,
        format_size(summary.total_bytes)
    );
    println!("Checksums saved to {}", summary.report_path.display());
    match (&summary.manifest_path, &summary.reconcile) {
        (Some(path), Some(report)) => println!(
            "Manifest {} updated: {} updated, {} added, {} removed",
            path.display(),
            report.updated,
            report.added,
            report.removed.len()
        ),
        _ => println!("Dry run: manifest not written"),
    }
    for archive in &summary.archives {
        println!("Archive ready for upload: {}", archive.display());
    }
    if !summary.skipped.is_empty() {
        println!("Skipped {} paths:", summary.skipped.len());
        for skipped in &summary.skipped {
            println!("  {}: {}", skipped.path, skipped.reason);
        }
    }
}

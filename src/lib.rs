//! Release packaging for the launcher: hashes tracked files and folders,
//! optionally zips folders, and keeps `version.json` in step for the updater.

pub mod archiver;
pub mod cleanup;
pub mod collector;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod util;
pub mod validator;

pub use engine::{PackagingEngine, RunOptions, RunSummary};
pub use error::{PackError, Result};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can go wrong while packaging a release.
///
/// Only [`PackError::Config`], [`PackError::Report`] and
/// [`PackError::ManifestWrite`] end a run; the rest are logged and the
/// affected path is left out of the checksum mapping.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("illegal file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("failed to archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("failed to load manifest {}: {message}", path.display())]
    ManifestLoad { path: PathBuf, message: String },

    #[error("failed to write manifest {}: {message}", path.display())]
    ManifestWrite { path: PathBuf, message: String },

    #[error("failed to write checksum report {}: {message}", path.display())]
    Report { path: PathBuf, message: String },

    #[error("invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to remove {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// The file or folder the error is about.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. }
            | Self::Archive { path, .. }
            | Self::ManifestLoad { path, .. }
            | Self::ManifestWrite { path, .. }
            | Self::Report { path, .. }
            | Self::Config { path, .. }
            | Self::Cleanup { path, .. } => Some(path),
            Self::InvalidName { .. } => None,
        }
    }

    /// True when the error ends the run instead of skipping one path.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Report { .. } | Self::ManifestWrite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PackError>;

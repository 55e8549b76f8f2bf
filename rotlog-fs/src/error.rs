//! Error types for output file and version operations.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from output file operations.
///
/// Every variant names the file and the step that failed.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to truncate {path}: {source}")]
    Truncate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list versions matching {pattern}: {message}")]
    List { pattern: String, message: String },

    #[error("output file {0} is closed")]
    Closed(PathBuf),
}

impl FsError {
    /// The underlying I/O error kind, if there is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            FsError::Stat { source, .. }
            | FsError::Open { source, .. }
            | FsError::Write { source, .. }
            | FsError::Sync { source, .. }
            | FsError::Rename { source, .. }
            | FsError::Truncate { source, .. } => Some(source.kind()),
            FsError::List { .. } | FsError::Closed(_) => None,
        }
    }
}

/// Errors from removing stale versions.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error(transparent)]
    List(#[from] FsError),

    #[error(
        "failed to remove {} of {attempted} stale versions: {}",
        .failures.len(),
        describe_failures(.failures)
    )]
    Remove {
        attempted: usize,
        failures: Vec<RemoveFailure>,
    },
}

/// A single version that could not be removed.
#[derive(Debug)]
pub struct RemoveFailure {
    pub path: PathBuf,
    pub source: io::Error,
}

impl RemoveFailure {
    pub fn new(path: &Path, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn describe_failures(failures: &[RemoveFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.path.display(), f.source))
        .collect::<Vec<_>>()
        .join("; ")
}

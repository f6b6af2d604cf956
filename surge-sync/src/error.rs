//! Error types for surge-sync.

use std::path::PathBuf;

use thiserror::Error;

use surge_core::ConfigError;
use surge_renderer::RenderError;

/// Errors that stop a whole run. Per-destination failures are reported in
/// the run summary instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("worker task failed: {0}")]
    Join(String),
}

/// The merge would produce nothing worth writing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("all {failed} upstream source(s) for {destination} failed; existing file kept")]
    AllUpstreamFailed { destination: PathBuf, failed: usize },

    #[error("merge for {destination} produced no entries; existing file kept")]
    EmptyResult { destination: PathBuf },
}

/// Writing one destination failed. The previous file, if any, is intact.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn commit_err(path: impl Into<PathBuf>, source: std::io::Error) -> CommitError {
    CommitError::Io {
        path: path.into(),
        source,
    }
}

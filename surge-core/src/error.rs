//! Error types for surge-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ResourceClass, SourceFormat};

/// Source configuration errors. Every variant is fatal: the run aborts before
/// any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse source config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("source config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("unsupported config version {found} (expected 1)")]
    UnsupportedVersion { found: u32 },

    #[error("{class}: invalid source id '{id}': {reason}")]
    InvalidId {
        class: ResourceClass,
        id: String,
        reason: &'static str,
    },

    #[error("{class}: duplicate source id '{id}'")]
    DuplicateId { class: ResourceClass, id: String },

    #[error("{class}/{id}: malformed origin '{origin}': {reason}")]
    InvalidOrigin {
        class: ResourceClass,
        id: String,
        origin: String,
        reason: &'static str,
    },

    #[error("{class}/{id}: invalid destination {destination}: {reason}")]
    InvalidDestination {
        class: ResourceClass,
        id: String,
        destination: PathBuf,
        reason: &'static str,
    },

    #[error("{class}/{id}: format '{format}' is not valid for this class")]
    FormatNotAllowed {
        class: ResourceClass,
        id: String,
        format: SourceFormat,
    },

    #[error("icon index base_url '{base_url}' is malformed: {reason}")]
    InvalidIndex {
        base_url: String,
        reason: &'static str,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

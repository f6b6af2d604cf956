//! Error types for surge-renderer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// Image destinations render from exactly one icon entry.
    #[error("image destination {destination} needs exactly one icon, got {count} entries")]
    IconShape { destination: PathBuf, count: usize },
}

//! surge-core — domain types, source registry, configuration errors.
//!
//! Public API surface:
//! - [`types`] — newtypes, resource classes, descriptors, config structs
//! - [`error`] — [`ConfigError`]
//! - [`registry`] — load / validate / path helpers
//! - [`digest`] — SHA-256 content hashes

pub mod digest;
pub mod error;
pub mod registry;
pub mod types;

pub use error::ConfigError;
pub use registry::Registry;
pub use types::{
    FetchSettings, HeaderSettings, IconIndexSettings, ResourceClass, SourceDescriptor,
    SourceFormat, SourceId, SyncConfig,
};

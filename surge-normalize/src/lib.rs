//! Format-specific normalization of fetched bytes into canonical entries.
//!
//! Three outcomes per source: a clean [`Normalized`], a [`Normalized`] with
//! some [`RecordError`]s (malformed lines dropped, rest kept), or a
//! [`FormatError`] when the content as a whole is not the declared format.

pub mod entry;
pub mod error;
pub mod icons;
pub mod modules;
pub mod rules;
mod text;

pub use entry::{CanonicalEntry, IconEntry, ModuleBlock, Normalized, RuleEntry, SemanticKey};
pub use error::{FormatError, RecordError};
pub use icons::ImageKind;

use surge_core::SourceFormat;

/// Normalize `raw` according to `format`. `name` names the entry for image
/// sources (the destination file stem) and is ignored for text formats.
pub fn normalize(format: SourceFormat, name: &str, raw: &[u8]) -> Result<Normalized, FormatError> {
    if raw.is_empty() {
        return Err(FormatError::Empty);
    }
    match format {
        SourceFormat::RuleList => rules::normalize_rules(raw),
        SourceFormat::Module => modules::normalize_module(raw),
        SourceFormat::Image => icons::normalize_image(name, raw),
    }
}

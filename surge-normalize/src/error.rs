//! Error types for surge-normalize.

use thiserror::Error;

/// The source as a whole does not match its format. Aborts that source only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("content is empty")]
    Empty,

    #[error("content is not valid UTF-8 text (invalid byte at offset {offset})")]
    NotUtf8 { offset: usize },

    #[error("content contains NUL bytes; binary data where text was expected")]
    Binary,

    /// Every candidate record was malformed, e.g. an HTML error page.
    #[error("no valid records: all {rejected} candidate line(s) were malformed (first: {first})")]
    NoValidRecords { rejected: usize, first: RecordError },

    #[error("module has neither metadata nor sections")]
    NoModuleContent,

    #[error("unrecognised image signature (leading bytes {leading})")]
    UnknownImage { leading: String },
}

/// One malformed record. Dropped and counted; the rest of the source survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}: `{text}`")]
pub struct RecordError {
    /// 1-based line number in the source.
    pub line: usize,
    pub reason: String,
    pub text: String,
}

impl RecordError {
    pub(crate) fn new(line: usize, reason: impl Into<String>, text: &str) -> Self {
        let mut text = text.trim().to_string();
        if text.len() > 120 {
            let mut cut = 120;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push('…');
        }
        Self {
            line,
            reason: reason.into(),
            text,
        }
    }
}

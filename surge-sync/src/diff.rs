//! Unified diffs between rendered output and the working tree, for
//! `surge-sync diff`.

use std::io::ErrorKind;
use std::path::Path;

use similar::TextDiff;

use crate::error::{commit_err, CommitError};

/// Unified diff from the on-disk file to `rendered`, or `None` when equal.
/// `label` is the path shown in the `a/` and `b/` headers.
pub fn unified_diff(label: &Path, existing: &str, rendered: &str) -> Option<String> {
    let existing = normalize_line_endings(existing);
    let rendered = normalize_line_endings(rendered);
    if existing == rendered {
        return None;
    }
    let label = label.to_string_lossy().replace('\\', "/");
    let old_header = format!("a/{label}");
    let new_header = format!("b/{label}");
    Some(
        TextDiff::from_lines(&existing, &rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
    )
}

/// Current text content of `path`; a missing file reads as empty.
pub fn read_existing_or_empty(path: &Path) -> Result<String, CommitError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(commit_err(path, err)),
    }
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

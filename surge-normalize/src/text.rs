//! Shared pre-checks for line-oriented text formats.

use crate::error::FormatError;

/// Decode `raw` as UTF-8 text, rejecting binary content. Strips a leading BOM.
pub(crate) fn decode(raw: &[u8]) -> Result<&str, FormatError> {
    if raw.contains(&0) {
        return Err(FormatError::Binary);
    }
    let text = std::str::from_utf8(raw).map_err(|e| FormatError::NotUtf8 {
        offset: e.valid_up_to(),
    })?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Lines with their 1-based numbers, trailing `\r` removed.
pub(crate) fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
}

/// `#`, `//` and `;` comments. `#!` metadata lines are not comments.
pub(crate) fn is_comment(trimmed: &str) -> bool {
    (trimmed.starts_with('#') && !trimmed.starts_with("#!"))
        || trimmed.starts_with("//")
        || trimmed.starts_with(';')
}

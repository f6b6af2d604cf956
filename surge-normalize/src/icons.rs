//! Image sources. Only the signature is checked; bytes pass through untouched.

use std::fmt;

use serde::Serialize;
use surge_core::digest::sha256_hex;

use crate::entry::{CanonicalEntry, IconEntry, Normalized};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
    Ico,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
            ImageKind::Ico => "ico",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Identify an image by its magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageKind::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageKind::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageKind::Webp)
    } else if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        Some(ImageKind::Ico)
    } else {
        None
    }
}

/// Wrap a fetched image as a single [`IconEntry`] named `name`.
pub fn normalize_image(name: &str, raw: &[u8]) -> Result<Normalized, FormatError> {
    if raw.is_empty() {
        return Err(FormatError::Empty);
    }
    let kind = sniff(raw).ok_or_else(|| FormatError::UnknownImage {
        leading: leading_hex(raw),
    })?;
    Ok(Normalized {
        entries: vec![CanonicalEntry::Icon(IconEntry {
            name: name.to_string(),
            kind,
            bytes: raw.to_vec(),
            content_hash: sha256_hex(raw),
        })],
        ..Normalized::default()
    })
}

fn leading_hex(raw: &[u8]) -> String {
    raw.iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[rstest]
    #[case(PNG, Some(ImageKind::Png))]
    #[case(b"\xff\xd8\xff\xe0\0\x10JFIF", Some(ImageKind::Jpeg))]
    #[case(b"GIF89a\x01\0\x01\0", Some(ImageKind::Gif))]
    #[case(b"RIFF\x24\0\0\0WEBPVP8 ", Some(ImageKind::Webp))]
    #[case(b"\0\0\x01\0\x01\0\x10\x10", Some(ImageKind::Ico))]
    #[case(b"<!DOCTYPE html>", None)]
    #[case(b"RIFF\x24\0\0\0WAVE", None)]
    fn signatures(#[case] bytes: &[u8], #[case] expected: Option<ImageKind>) {
        assert_eq!(sniff(bytes), expected);
    }

    #[test]
    fn image_keeps_bytes_and_hash() {
        let n = normalize_image("Telegram", PNG).unwrap();
        assert_eq!(n.entries.len(), 1);
        match &n.entries[0] {
            CanonicalEntry::Icon(icon) => {
                assert_eq!(icon.name, "Telegram");
                assert_eq!(icon.bytes, PNG);
                assert_eq!(icon.content_hash, sha256_hex(PNG));
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn html_error_page_is_rejected() {
        let err = normalize_image("Telegram", b"<html>404 Not Found</html>").unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownImage {
                leading: "3c 68 74 6d 6c 3e 34 30".to_string()
            }
        );
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_eq!(normalize_image("x", b""), Err(FormatError::Empty));
    }
}

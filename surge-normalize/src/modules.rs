//! `.sgmodule` grammar: a `#!key=value` metadata block followed by
//! `[Section]` blocks.

use std::collections::HashSet;

use crate::entry::{CanonicalEntry, ModuleBlock, Normalized};
use crate::error::{FormatError, RecordError};
use crate::rules::parse_rule;
use crate::text::{decode, is_comment, numbered_lines};

/// Section headers a module may contain.
pub const MODULE_SECTIONS: &[&str] = &[
    "General",
    "Replica",
    "Proxy",
    "Proxy Group",
    "Rule",
    "Host",
    "URL Rewrite",
    "Header Rewrite",
    "Body Rewrite",
    "Map Local",
    "Script",
    "MITM",
    "Panel",
    "WireGuard",
];

/// Canonical spelling of a known section, matched case-insensitively.
fn known_section(name: &str) -> Option<&'static str> {
    MODULE_SECTIONS
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(name))
}

#[derive(Clone, Copy)]
enum Cursor {
    /// Before the first section header.
    Preamble,
    Section(usize),
    /// Inside an unknown section; lines are dropped.
    Skipping,
}

pub fn normalize_module(raw: &[u8]) -> Result<Normalized, FormatError> {
    let text = decode(raw)?;
    let mut metadata: Vec<String> = Vec::new();
    let mut blocks: Vec<ModuleBlock> = Vec::new();
    let mut rejected: Vec<RecordError> = Vec::new();
    let mut cursor = Cursor::Preamble;

    for (line_no, line) in numbered_lines(text) {
        let line = line.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            match known_section(header.trim()) {
                Some(name) => {
                    blocks.push(ModuleBlock {
                        name: name.to_string(),
                        lines: Vec::new(),
                    });
                    cursor = Cursor::Section(blocks.len() - 1);
                }
                None => {
                    rejected.push(RecordError::new(line_no, "unknown section", trimmed));
                    cursor = Cursor::Skipping;
                }
            }
            continue;
        }

        match cursor {
            Cursor::Preamble if trimmed.starts_with("#!") => {
                if trimmed[2..].contains('=') {
                    metadata.push(trimmed.to_string());
                } else {
                    rejected.push(RecordError::new(
                        line_no,
                        "metadata line is not key=value",
                        trimmed,
                    ));
                }
            }
            Cursor::Preamble => {
                rejected.push(RecordError::new(
                    line_no,
                    "content before first section",
                    trimmed,
                ));
            }
            Cursor::Skipping => {}
            Cursor::Section(idx) => {
                let block = &mut blocks[idx];
                if block.name == "Rule" {
                    if let Err(reason) = parse_rule(trimmed) {
                        rejected.push(RecordError::new(line_no, reason, trimmed));
                        continue;
                    }
                }
                block.lines.push(line.to_string());
            }
        }
    }

    if metadata.is_empty() && blocks.is_empty() {
        return Err(FormatError::NoModuleContent);
    }

    let mut out = Normalized {
        rejected,
        ..Normalized::default()
    };
    let mut seen = HashSet::new();
    if !metadata.is_empty() {
        out.push_unique(
            &mut seen,
            CanonicalEntry::Module(ModuleBlock {
                name: ModuleBlock::METADATA.to_string(),
                lines: metadata,
            }),
        );
    }
    for block in blocks {
        out.push_unique(&mut seen, CanonicalEntry::Module(block));
    }
    Ok(out)
}

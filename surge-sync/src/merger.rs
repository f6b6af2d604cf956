//! Merger: many normalized sources plus private overrides in, one
//! deduplicated [`MergedResource`] out.
//!
//! Inputs are applied in ascending priority (stable, so equal priorities keep
//! registry order); a later entry with an already-seen key replaces the value
//! but keeps the position where the key first appeared. Private overrides are
//! applied after every upstream input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use surge_core::digest::ContentHasher;
use surge_normalize::{CanonicalEntry, SemanticKey};

use crate::error::MergeError;

/// Entries from one successfully normalized source.
#[derive(Debug, Clone)]
pub struct MergeInput {
    pub priority: i32,
    pub entries: Vec<CanonicalEntry>,
}

/// The final artifact for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedResource {
    pub destination: PathBuf,
    pub entries: Vec<CanonicalEntry>,
    /// Hash over the canonical ordered entries.
    pub content_hash: String,
    /// Entries whose value was replaced by a later source or override.
    pub overridden: usize,
}

pub fn merge(
    destination: &Path,
    mut upstream: Vec<MergeInput>,
    private: Vec<Vec<CanonicalEntry>>,
) -> Result<MergedResource, MergeError> {
    upstream.sort_by_key(|input| input.priority);

    let mut entries: Vec<CanonicalEntry> = Vec::new();
    let mut positions: HashMap<SemanticKey, usize> = HashMap::new();
    let mut overridden = 0usize;

    let ordered = upstream
        .into_iter()
        .map(|input| input.entries)
        .chain(private);
    for source in ordered {
        for entry in source {
            let key = entry.key();
            match positions.get(&key) {
                Some(&idx) => {
                    if entries[idx] != entry {
                        overridden += 1;
                    }
                    entries[idx] = entry;
                }
                None => {
                    positions.insert(key, entries.len());
                    entries.push(entry);
                }
            }
        }
    }

    if entries.is_empty() {
        return Err(MergeError::EmptyResult {
            destination: destination.to_path_buf(),
        });
    }

    Ok(MergedResource {
        destination: destination.to_path_buf(),
        content_hash: content_hash(&entries),
        entries,
        overridden,
    })
}

/// Digest of the canonical ordered entries, independent of rendering.
pub fn content_hash(entries: &[CanonicalEntry]) -> String {
    let mut hasher = ContentHasher::new();
    for entry in entries {
        match entry {
            CanonicalEntry::Rule(rule) => {
                hasher.part(b"rule").part(rule.to_line().as_bytes());
            }
            CanonicalEntry::Icon(icon) => {
                hasher
                    .part(b"icon")
                    .part(icon.name.as_bytes())
                    .part(icon.content_hash.as_bytes());
            }
            CanonicalEntry::Module(block) => {
                hasher.part(b"module").part(block.name.as_bytes());
                for line in &block.lines {
                    hasher.part(line.as_bytes());
                }
            }
        }
    }
    hasher.finish()
}

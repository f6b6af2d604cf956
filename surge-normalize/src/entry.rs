//! Canonical entries and their semantic keys.

use std::fmt;

use serde::Serialize;

use crate::error::RecordError;
use crate::icons::ImageKind;

/// Identity of an entry for deduplication and override purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SemanticKey {
    /// Rule type + normalized value.
    Rule { kind: String, value: String },
    /// Icon name.
    Icon(String),
    /// Module block name, lower-cased.
    Module(String),
}

impl fmt::Display for SemanticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticKey::Rule { kind, value } => write!(f, "{kind},{value}"),
            SemanticKey::Icon(name) => write!(f, "icon:{name}"),
            SemanticKey::Module(name) => write!(f, "[{name}]"),
        }
    }
}

/// One proxy rule, e.g. `DOMAIN-SUFFIX,google.com,PROXY,no-resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuleEntry {
    /// Upper-case rule type.
    pub kind: String,
    pub value: String,
    pub policy: Option<String>,
    /// Lower-case trailing flags such as `no-resolve`.
    pub options: Vec<String>,
}

impl RuleEntry {
    /// Canonical one-line rendering.
    pub fn to_line(&self) -> String {
        let mut line = format!("{},{}", self.kind, self.value);
        if let Some(policy) = &self.policy {
            line.push(',');
            line.push_str(policy);
        }
        for opt in &self.options {
            line.push(',');
            line.push_str(opt);
        }
        line
    }
}

/// One icon image.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IconEntry {
    pub name: String,
    pub kind: ImageKind,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

impl fmt::Debug for IconEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconEntry")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .field("content_hash", &self.content_hash)
            .finish()
    }
}

/// One named block of a module script (`#!` metadata or a `[Section]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleBlock {
    /// Section name as it appears in the header, or [`ModuleBlock::METADATA`].
    pub name: String,
    pub lines: Vec<String>,
}

impl ModuleBlock {
    /// Name of the leading `#!key=value` block.
    pub const METADATA: &'static str = "#!metadata";

    pub fn is_metadata(&self) -> bool {
        self.name == Self::METADATA
    }
}

/// The normalized unit of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanonicalEntry {
    Rule(RuleEntry),
    Icon(IconEntry),
    Module(ModuleBlock),
}

impl CanonicalEntry {
    pub fn key(&self) -> SemanticKey {
        match self {
            CanonicalEntry::Rule(r) => SemanticKey::Rule {
                kind: r.kind.clone(),
                value: r.value.clone(),
            },
            CanonicalEntry::Icon(i) => SemanticKey::Icon(i.name.clone()),
            CanonicalEntry::Module(m) => SemanticKey::Module(m.name.to_ascii_lowercase()),
        }
    }
}

/// Output of normalizing one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Unique by semantic key, in source order.
    pub entries: Vec<CanonicalEntry>,
    /// Malformed records that were dropped.
    pub rejected: Vec<RecordError>,
    /// Entries dropped because an earlier entry had the same key.
    pub duplicates: usize,
}

impl Normalized {
    /// Append `entry` unless its key was already seen.
    pub(crate) fn push_unique(
        &mut self,
        seen: &mut std::collections::HashSet<SemanticKey>,
        entry: CanonicalEntry,
    ) {
        if seen.insert(entry.key()) {
            self.entries.push(entry);
        } else {
            self.duplicates += 1;
        }
    }
}

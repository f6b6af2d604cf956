//! Domain types for the source registry.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Configuration types are deserializable via serde + serde_yaml.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a source, unique within its resource class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The three categories of synchronized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Icons,
    Rules,
    Modules,
}

impl ResourceClass {
    /// All classes in run order.
    pub fn all() -> &'static [ResourceClass] {
        &[ResourceClass::Icons, ResourceClass::Rules, ResourceClass::Modules]
    }

    /// Top-level directory of this class inside the working tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ResourceClass::Icons => "icons",
            ResourceClass::Rules => "rules",
            ResourceClass::Modules => "modules",
        }
    }

    /// The only source format accepted for this class.
    pub fn format(&self) -> SourceFormat {
        match self {
            ResourceClass::Icons => SourceFormat::Image,
            ResourceClass::Rules => SourceFormat::RuleList,
            ResourceClass::Modules => SourceFormat::Module,
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for ResourceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icons" => Ok(ResourceClass::Icons),
            "rules" => Ok(ResourceClass::Rules),
            "modules" => Ok(ResourceClass::Modules),
            other => Err(format!(
                "unknown resource class '{other}'; expected: icons, rules, modules"
            )),
        }
    }
}

/// Expected structural format of an upstream artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// One proxy rule per line (`TYPE,VALUE[,POLICY]`).
    RuleList,
    /// A module script with `#!` metadata and `[Section]` blocks.
    Module,
    /// A single binary icon image.
    Image,
}

impl SourceFormat {
    /// Whether the format is line-oriented text.
    pub fn is_text(&self) -> bool {
        !matches!(self, SourceFormat::Image)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::RuleList => write!(f, "rule-list"),
            SourceFormat::Module => write!(f, "module"),
            SourceFormat::Image => write!(f, "image"),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// One upstream artifact, as validated by the registry.
///
/// Immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub resource_class: ResourceClass,
    pub id: SourceId,
    pub origin: String,
    /// Relative to the class directory (e.g. `proxy/global.conf`).
    pub destination: PathBuf,
    pub format: SourceFormat,
    pub priority: i32,
    /// Applied as a private override for its destination.
    pub private: bool,
}

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

/// One descriptor as written in the YAML file (class is implied by the section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub id: String,
    pub origin: String,
    pub destination: PathBuf,
    pub format: SourceFormat,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub private: bool,
}

/// Network policy shared by every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub attempts: u32,
    pub backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub concurrency: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            attempts: 3,
            backoff_ms: 500,
            max_backoff_ms: 8_000,
            concurrency: 6,
            max_bytes: 16 * 1024 * 1024,
            user_agent: format!("surge-sync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Optional lines stamped into generated file headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// Settings for the generated icon index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconIndexSettings {
    /// Relative to the icons directory.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_index_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("icons.json")
}

fn default_index_name() -> String {
    "Surge Icons".to_string()
}

/// One resource-class section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassSection {
    pub sources: Vec<SourceSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IconIndexSettings>,
}

/// Root of the `surge-sync.yaml` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub header: HeaderSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub icons: ClassSection,
    #[serde(default)]
    pub rules: ClassSection,
    #[serde(default)]
    pub modules: ClassSection,
}

fn default_version() -> u32 {
    1
}

impl SyncConfig {
    /// The section describing `class`.
    pub fn section(&self, class: ResourceClass) -> &ClassSection {
        match class {
            ResourceClass::Icons => &self.icons,
            ResourceClass::Rules => &self.rules,
            ResourceClass::Modules => &self.modules,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

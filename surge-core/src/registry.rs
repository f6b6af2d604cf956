//! Source registry: the loaded-once, read-only list of upstream sources.
//!
//! # Working tree layout
//!
//! ```text
//! <root>/
//!   surge-sync.yaml          (source config, one section per class)
//!   icons/                   (class directory)
//!     private/               (operator overrides, read only)
//!     apps/chatgpt.png
//!   rules/
//!     private/proxy/global.conf
//!     proxy/global.conf
//!   modules/
//! ```
//!
//! # API pattern
//!
//! Path helpers take an explicit `root`; nothing here consults the process
//! working directory, so tests run against a `TempDir`.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::{
    FetchSettings, HeaderSettings, IconIndexSettings, ResourceClass, SourceDescriptor,
    SourceId, SyncConfig,
};

/// Default config file name at the working tree root.
pub const CONFIG_FILE: &str = "surge-sync.yaml";

/// Reserved per-class override directory.
pub const PRIVATE_DIR: &str = "private";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<root>/surge-sync.yaml`. Pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// `<root>/<class>/`
pub fn class_dir_at(root: &Path, class: ResourceClass) -> PathBuf {
    root.join(class.dir_name())
}

/// `<root>/<class>/<destination>`
pub fn destination_path_at(root: &Path, class: ResourceClass, destination: &Path) -> PathBuf {
    class_dir_at(root, class).join(destination)
}

/// `<root>/<class>/private/<destination>`: the override source for a destination.
pub fn private_override_path_at(
    root: &Path,
    class: ResourceClass,
    destination: &Path,
) -> PathBuf {
    class_dir_at(root, class).join(PRIVATE_DIR).join(destination)
}

// ---------------------------------------------------------------------------
// 2. Registry
// ---------------------------------------------------------------------------

/// Validated, immutable source configuration.
#[derive(Debug, Clone)]
pub struct Registry {
    config: SyncConfig,
    sources: HashMap<ResourceClass, Vec<SourceDescriptor>>,
}

impl Registry {
    /// Validate a parsed config and build descriptors for every class.
    pub fn from_config(config: SyncConfig) -> Result<Self, ConfigError> {
        if config.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
            });
        }

        let mut sources = HashMap::new();
        for class in ResourceClass::all() {
            sources.insert(*class, build_descriptors(*class, &config)?);
        }

        if let Some(index) = &config.icons.index {
            validate_origin(&index.base_url).map_err(|reason| ConfigError::InvalidIndex {
                base_url: index.base_url.clone(),
                reason,
            })?;
            validate_destination(&index.path).map_err(|reason| {
                ConfigError::InvalidDestination {
                    class: ResourceClass::Icons,
                    id: "index".to_string(),
                    destination: index.path.clone(),
                    reason,
                }
            })?;
        }

        Ok(Self { config, sources })
    }

    /// Ordered descriptors for `class`, in config file order.
    pub fn list_sources(&self, class: ResourceClass) -> &[SourceDescriptor] {
        self.sources.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fetch_settings(&self) -> &FetchSettings {
        &self.config.fetch
    }

    pub fn header(&self) -> &HeaderSettings {
        &self.config.header
    }

    pub fn icon_index(&self) -> Option<&IconIndexSettings> {
        self.config.icons.index.as_ref()
    }
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<Registry, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_str(&contents, path)
}

/// Parse and validate config text; `path` is only used in error messages.
pub fn parse_str(contents: &str, path: &Path) -> Result<Registry, ConfigError> {
    let config: SyncConfig = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Registry::from_config(config)
}

// ---------------------------------------------------------------------------
// 4. Validation
// ---------------------------------------------------------------------------

fn build_descriptors(
    class: ResourceClass,
    config: &SyncConfig,
) -> Result<Vec<SourceDescriptor>, ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut out = Vec::new();

    for spec in &config.section(class).sources {
        validate_id(&spec.id).map_err(|reason| ConfigError::InvalidId {
            class,
            id: spec.id.clone(),
            reason,
        })?;
        if !seen_ids.insert(spec.id.clone()) {
            return Err(ConfigError::DuplicateId {
                class,
                id: spec.id.clone(),
            });
        }
        validate_origin(&spec.origin).map_err(|reason| ConfigError::InvalidOrigin {
            class,
            id: spec.id.clone(),
            origin: spec.origin.clone(),
            reason,
        })?;
        validate_destination(&spec.destination).map_err(|reason| {
            ConfigError::InvalidDestination {
                class,
                id: spec.id.clone(),
                destination: spec.destination.clone(),
                reason,
            }
        })?;
        if spec.format != class.format() {
            return Err(ConfigError::FormatNotAllowed {
                class,
                id: spec.id.clone(),
                format: spec.format,
            });
        }

        out.push(SourceDescriptor {
            resource_class: class,
            id: SourceId::from(spec.id.as_str()),
            origin: spec.origin.trim().to_string(),
            destination: spec.destination.clone(),
            format: spec.format,
            priority: spec.priority,
            private: spec.private,
        });
    }
    Ok(out)
}

fn validate_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("id must not be empty");
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err("only ASCII letters, digits, '.', '_' and '-' are allowed");
    }
    Ok(())
}

/// Check that `origin` is an absolute `https://` URI with a host.
pub fn validate_origin(origin: &str) -> Result<(), &'static str> {
    let origin = origin.trim();
    if origin.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("contains whitespace or control characters");
    }
    let Some((scheme, rest)) = origin.split_once("://") else {
        return Err("missing scheme");
    };
    if !scheme.eq_ignore_ascii_case("https") {
        return Err("only https origins are allowed");
    }
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let (host, port) = match host_port.rsplit_once(':') {
        // Bracketed IPv6 literals contain ':' themselves.
        Some((h, p)) if !p.contains(']') => (h, Some(p)),
        _ => (host_port, None),
    };
    if host.is_empty() {
        return Err("missing host");
    }
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err("invalid port");
        }
    }
    Ok(())
}

fn validate_destination(destination: &Path) -> Result<(), &'static str> {
    if destination.as_os_str().is_empty() {
        return Err("destination must not be empty");
    }
    let mut components = destination.components();
    match components.next() {
        Some(Component::Normal(first)) if first == PRIVATE_DIR => {
            return Err("the private/ directory is reserved for overrides");
        }
        Some(Component::Normal(_)) => {}
        _ => return Err("destination must be a plain relative path"),
    }
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        return Err("destination must be a plain relative path");
    }
    if destination.file_name().is_none() {
        return Err("destination must name a file");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

//! Template contexts built from merged canonical entries.

use std::path::Path;

use serde::Serialize;
use surge_normalize::{CanonicalEntry, ModuleBlock};

use crate::error::RenderError;

/// Payload for rule-list and module templates.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceContext {
    /// Destination file stem, e.g. `telegram` for `social/telegram.conf`.
    pub name: String,
    /// Destination path relative to its class directory.
    pub destination: String,
    pub entry_count: usize,
    /// Origins of the sources that contributed, in registry order.
    pub upstreams: Vec<String>,
    pub homepage: Option<String>,
    /// Rule lines; empty for modules.
    pub lines: Vec<String>,
    /// Module blocks; empty for rule lists.
    pub blocks: Vec<BlockCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockCtx {
    pub name: String,
    /// `[Name]`, or `None` for the metadata block.
    pub header: Option<String>,
    pub lines: Vec<String>,
}

impl From<&ModuleBlock> for BlockCtx {
    fn from(block: &ModuleBlock) -> Self {
        BlockCtx {
            name: block.name.clone(),
            header: (!block.is_metadata()).then(|| format!("[{}]", block.name)),
            lines: block.lines.clone(),
        }
    }
}

impl ResourceContext {
    pub fn from_entries(
        destination: &Path,
        entries: &[CanonicalEntry],
        upstreams: Vec<String>,
        homepage: Option<String>,
    ) -> Self {
        let mut lines = Vec::new();
        let mut blocks = Vec::new();
        for entry in entries {
            match entry {
                CanonicalEntry::Rule(rule) => lines.push(rule.to_line()),
                CanonicalEntry::Module(block) => blocks.push(BlockCtx::from(block)),
                CanonicalEntry::Icon(_) => {}
            }
        }
        // Metadata must lead regardless of merge order.
        blocks.sort_by_key(|b| b.header.is_some());

        ResourceContext {
            name: file_stem(destination),
            destination: destination.to_string_lossy().replace('\\', "/"),
            entry_count: entries.len(),
            upstreams,
            homepage,
            lines,
            blocks,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

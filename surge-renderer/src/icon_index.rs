//! The generated icon index (`icons/icons.json` by default).
//!
//! Serialized with serde_json rather than a template so the file is always
//! valid JSON, whatever overrides a project installs.

use std::path::Path;

use serde::Serialize;

use crate::engine::finish;
use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconIndex {
    pub name: String,
    pub description: String,
    pub icons: Vec<IconRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconRef {
    pub name: String,
    pub url: String,
}

impl IconIndex {
    /// Build an index over icon destinations (relative to `icons/`), sorted
    /// by path so the output does not depend on fetch order.
    pub fn new<P: AsRef<Path>>(
        name: &str,
        description: &str,
        base_url: &str,
        destinations: &[P],
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut rels: Vec<String> = destinations
            .iter()
            .map(|p| p.as_ref().to_string_lossy().replace('\\', "/"))
            .collect();
        rels.sort();
        rels.dedup();
        let icons = rels
            .into_iter()
            .map(|rel| IconRef {
                name: Path::new(&rel)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                url: format!("{base}/{rel}"),
            })
            .collect();
        IconIndex {
            name: name.to_string(),
            description: description.to_string(),
            icons,
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(finish(serde_json::to_string_pretty(self)?))
    }
}

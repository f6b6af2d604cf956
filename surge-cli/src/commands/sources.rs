//! `surge-sync sources`: list configured source descriptors.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use surge_core::{registry, ResourceClass, SourceDescriptor};

use crate::GlobalArgs;

/// Arguments for `surge-sync sources`.
#[derive(Args, Debug)]
pub struct SourcesArgs {
    /// Only list sources of this class.
    #[arg(long)]
    pub class: Option<ResourceClass>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "class")]
    class: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "destination")]
    destination: String,
    #[tabled(rename = "priority")]
    priority: String,
    #[tabled(rename = "origin")]
    origin: String,
}

impl From<&SourceDescriptor> for SourceRow {
    fn from(d: &SourceDescriptor) -> Self {
        SourceRow {
            class: d.resource_class.to_string(),
            id: d.id.to_string(),
            destination: d.destination.to_string_lossy().replace('\\', "/"),
            priority: if d.private {
                "private".to_string()
            } else {
                d.priority.to_string()
            },
            origin: d.origin.clone(),
        }
    }
}

impl SourcesArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let path = global
            .config
            .clone()
            .unwrap_or_else(|| registry::config_path_at(&global.root));
        let registry = registry::load_at(&path)
            .with_context(|| format!("failed to load source configuration {}", path.display()))?;

        let descriptors: Vec<&SourceDescriptor> = ResourceClass::all()
            .iter()
            .filter(|class| self.class.map_or(true, |wanted| wanted == **class))
            .flat_map(|class| registry.list_sources(*class))
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&descriptors)
                    .context("failed to serialize sources")?
            );
            return Ok(ExitCode::SUCCESS);
        }

        if descriptors.is_empty() {
            println!("No sources configured.");
            return Ok(ExitCode::SUCCESS);
        }
        let rows: Vec<SourceRow> = descriptors.into_iter().map(SourceRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(ExitCode::SUCCESS)
    }
}

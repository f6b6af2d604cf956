//! Runner: the shared entrypoint used by every CLI command.
//!
//! Classes always run in the order icons → rules → modules, each to
//! completion, regardless of the order they were requested in.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use surge_core::{registry, Registry, ResourceClass};
use surge_fetch::Fetcher;
use surge_renderer::TemplateEngine;

use crate::error::SyncError;
use crate::orchestrator::{sync_class, Mode, Shutdown, SyncContext};
use crate::summary::{Counts, RunSummary};

/// Everything one invocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summaries: Vec<RunSummary>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Shutdown was requested while running.
    pub interrupted: bool,
}

impl RunReport {
    pub fn destination_count(&self) -> usize {
        self.summaries.iter().map(|s| s.destinations.len()).sum()
    }

    pub fn counts(&self) -> Counts {
        self.summaries.iter().fold(Counts::default(), |mut acc, s| {
            let c = s.counts();
            acc.updated += c.updated;
            acc.unchanged += c.unchanged;
            acc.would_update += c.would_update;
            acc.failed += c.failed;
            acc
        })
    }

    pub fn has_failures(&self) -> bool {
        self.summaries.iter().any(RunSummary::has_failures)
    }

    pub fn has_source_failures(&self) -> bool {
        self.summaries.iter().any(RunSummary::has_source_failures)
    }

    /// `false` if any destination failed; with `strict`, also if any source
    /// failed.
    pub fn is_success(&self, strict: bool) -> bool {
        !(self.has_failures() || self.interrupted || (strict && self.has_source_failures()))
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

pub struct Runner {
    ctx: SyncContext,
}

impl Runner {
    /// Build from an already validated registry, with the production fetcher
    /// and templates from `<root>/.surge-sync/templates`.
    pub fn new(root: &Path, registry: Registry, mode: Mode) -> Result<Self, SyncError> {
        let fetcher = Fetcher::from_settings(registry.fetch_settings());
        Self::with_fetcher(root, registry, fetcher, mode)
    }

    /// Load `config` (default `<root>/surge-sync.yaml`) and build a runner.
    /// Any configuration problem aborts here, before network I/O.
    pub fn load(root: &Path, config: Option<&Path>, mode: Mode) -> Result<Self, SyncError> {
        let config_path = config
            .map(Path::to_path_buf)
            .unwrap_or_else(|| registry::config_path_at(root));
        let registry = registry::load_at(&config_path)?;
        Self::new(root, registry, mode)
    }

    pub fn with_fetcher(
        root: &Path,
        registry: Registry,
        fetcher: Fetcher,
        mode: Mode,
    ) -> Result<Self, SyncError> {
        let engine = TemplateEngine::for_root(root)?;
        Ok(Self {
            ctx: SyncContext {
                root: root.to_path_buf(),
                registry: Arc::new(registry),
                fetcher,
                engine: Arc::new(engine),
                mode,
            },
        })
    }

    pub fn root(&self) -> &Path {
        &self.ctx.root
    }

    pub fn registry(&self) -> &Registry {
        &self.ctx.registry
    }

    /// Run the requested classes. Per-destination failures are reported in
    /// the summaries; only infrastructure errors return `Err`.
    pub async fn run(
        &self,
        classes: &[ResourceClass],
        shutdown: &Shutdown,
    ) -> Result<RunReport, SyncError> {
        let started_at = Utc::now();
        let mut summaries = Vec::new();
        for class in ResourceClass::all() {
            if !classes.contains(class) {
                continue;
            }
            if shutdown.is_requested() {
                tracing::warn!(class = %class, "skipping class after shutdown request");
                break;
            }
            summaries.push(sync_class(&self.ctx, *class, shutdown).await?);
        }
        Ok(RunReport {
            summaries,
            started_at,
            finished_at: Utc::now(),
            interrupted: shutdown.is_requested(),
        })
    }
}

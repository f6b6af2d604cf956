//! Sync orchestrator for one resource class.
//!
//! ```text
//! Start → (per source: Fetch → Normalize)* → Merge per destination
//!       → Render → Commit per destination → Completed
//! ```
//!
//! Fetch + normalize run concurrently on the blocking pool, bounded by a
//! semaphore. Results are slotted by registry index, so the merged output
//! never depends on completion order. Destinations are then merged and
//! committed one at a time; a failure is recorded on its report and the
//! next destination proceeds.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

use surge_core::registry::{class_dir_at, destination_path_at, private_override_path_at};
use surge_core::{IconIndexSettings, Registry, ResourceClass, SourceDescriptor, SourceId};
use surge_fetch::Fetcher;
use surge_normalize::{normalize, Normalized};
use surge_renderer::{IconIndex, TemplateEngine};

use crate::diff::{read_existing_or_empty, unified_diff};
use crate::error::{MergeError, SyncError};
use crate::merger::{merge, MergeInput};
use crate::summary::{
    DestinationReport, DestinationStatus, FailureKind, RunSummary, SourceReport, SourceStatus,
};
use crate::writer::{CommitOutcome, Committer};

/// Upper bound on concurrent fetches per class.
pub const MAX_CONCURRENCY: usize = 16;

/// What to do with rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    /// Report `WouldUpdate` instead of writing.
    DryRun,
    /// Like `DryRun`, and attach unified diffs for text outputs.
    Diff,
}

/// Process-level shutdown request.
///
/// Once triggered, sources that have not started fetching are reported as
/// cancelled; in-flight fetches run to completion or timeout.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    requested: Arc<AtomicBool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    /// Wake listeners without requesting cancellation (run finished).
    pub fn close(&self) {
        let _ = self.tx.send(());
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

/// Everything one class run needs. Cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub root: PathBuf,
    pub registry: Arc<Registry>,
    pub fetcher: Fetcher,
    pub engine: Arc<TemplateEngine>,
    pub mode: Mode,
}

/// A fetched and normalized source, before merge.
#[derive(Debug, Clone)]
struct SourceOutcome {
    report: SourceReport,
    normalized: Option<Normalized>,
}

impl SourceOutcome {
    fn cancelled(descriptor: &SourceDescriptor) -> Self {
        SourceOutcome {
            report: SourceReport {
                id: descriptor.id.clone(),
                origin: descriptor.origin.clone(),
                private: descriptor.private,
                status: SourceStatus::Cancelled,
                fetched_at: None,
                content_hash: None,
            },
            normalized: None,
        }
    }
}

/// Run the pipeline for one class.
pub async fn sync_class(
    ctx: &SyncContext,
    class: ResourceClass,
    shutdown: &Shutdown,
) -> Result<RunSummary, SyncError> {
    let started_at = Utc::now();
    let descriptors: Vec<SourceDescriptor> = ctx.registry.list_sources(class).to_vec();
    tracing::info!(class = %class, sources = descriptors.len(), "sync started");

    let outcomes = collect_sources(ctx, &descriptors, shutdown).await?;

    let ctx_for_commit = ctx.clone();
    let destinations = tokio::task::spawn_blocking(move || {
        commit_all(&ctx_for_commit, class, &descriptors, outcomes)
    })
    .await
    .map_err(|e| SyncError::Join(e.to_string()))?;

    let summary = RunSummary {
        resource_class: class,
        destinations,
        started_at,
        finished_at: Utc::now(),
    };
    let counts = summary.counts();
    tracing::info!(
        class = %class,
        updated = counts.updated,
        unchanged = counts.unchanged,
        would_update = counts.would_update,
        failed = counts.failed,
        "sync completed",
    );
    Ok(summary)
}

async fn collect_sources(
    ctx: &SyncContext,
    descriptors: &[SourceDescriptor],
    shutdown: &Shutdown,
) -> Result<Vec<SourceOutcome>, SyncError> {
    let limit = ctx
        .registry
        .fetch_settings()
        .concurrency
        .clamp(1, MAX_CONCURRENCY);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut set = JoinSet::new();

    for (idx, descriptor) in descriptors.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let shutdown = shutdown.clone();
        let fetcher = ctx.fetcher.clone();
        set.spawn(async move {
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) if !shutdown.is_requested() => permit,
                _ => return Ok((idx, SourceOutcome::cancelled(&descriptor))),
            };
            let outcome = tokio::task::spawn_blocking(move || {
                let outcome = fetch_and_normalize(&fetcher, &descriptor);
                drop(permit);
                outcome
            })
            .await?;
            Ok::<_, tokio::task::JoinError>((idx, outcome))
        });
    }

    let mut slots: Vec<Option<SourceOutcome>> = (0..descriptors.len()).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (idx, outcome) = joined
            .map_err(|e| SyncError::Join(e.to_string()))?
            .map_err(|e| SyncError::Join(e.to_string()))?;
        slots[idx] = Some(outcome);
    }

    Ok(slots
        .into_iter()
        .zip(descriptors)
        .map(|(slot, d)| slot.unwrap_or_else(|| SourceOutcome::cancelled(d)))
        .collect())
}

fn fetch_and_normalize(fetcher: &Fetcher, descriptor: &SourceDescriptor) -> SourceOutcome {
    let fetched = fetcher.fetch(descriptor);
    let (status, normalized) = match &fetched.body {
        Err(failed) => {
            tracing::warn!(source = %descriptor.id, error = %failed, "source fetch failed");
            (
                SourceStatus::FetchFailed {
                    reason: failed.to_string(),
                },
                None,
            )
        }
        Ok(body) => normalize_source(&descriptor.id, descriptor, body),
    };
    SourceOutcome {
        report: SourceReport {
            id: descriptor.id.clone(),
            origin: descriptor.origin.clone(),
            private: descriptor.private,
            status,
            fetched_at: Some(fetched.fetched_at),
            content_hash: fetched.content_hash,
        },
        normalized,
    }
}

fn normalize_source(
    id: &SourceId,
    descriptor: &SourceDescriptor,
    body: &[u8],
) -> (SourceStatus, Option<Normalized>) {
    match normalize(descriptor.format, &file_stem(&descriptor.destination), body) {
        Ok(normalized) => {
            if let Some(first) = normalized.rejected.first() {
                tracing::warn!(
                    source = %id,
                    rejected = normalized.rejected.len(),
                    first = %first,
                    "dropped malformed records",
                );
            }
            if normalized.duplicates > 0 {
                tracing::debug!(source = %id, duplicates = normalized.duplicates, "collapsed duplicates");
            }
            let status = SourceStatus::Ok {
                entries: normalized.entries.len(),
                rejected: normalized.rejected.len(),
                duplicates: normalized.duplicates,
            };
            (status, Some(normalized))
        }
        Err(err) => {
            tracing::warn!(source = %id, error = %err, "source content rejected");
            (
                SourceStatus::FormatError {
                    reason: err.to_string(),
                },
                None,
            )
        }
    }
}

/// Destinations in first-appearance order with the indices of their sources.
fn group_by_destination(descriptors: &[SourceDescriptor]) -> Vec<(PathBuf, Vec<usize>)> {
    let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
    for (idx, d) in descriptors.iter().enumerate() {
        match groups.iter_mut().find(|(dest, _)| *dest == d.destination) {
            Some((_, members)) => members.push(idx),
            None => groups.push((d.destination.clone(), vec![idx])),
        }
    }
    groups
}

fn commit_all(
    ctx: &SyncContext,
    class: ResourceClass,
    descriptors: &[SourceDescriptor],
    outcomes: Vec<SourceOutcome>,
) -> Vec<DestinationReport> {
    let mut reports = Vec::new();
    for (destination, members) in group_by_destination(descriptors) {
        let inputs: Vec<(&SourceDescriptor, &SourceOutcome)> = members
            .iter()
            .map(|&i| (&descriptors[i], &outcomes[i]))
            .collect();
        reports.push(commit_destination(ctx, class, &destination, &inputs));
    }

    if class == ResourceClass::Icons {
        if let Some(index) = ctx.registry.icon_index() {
            reports.push(commit_icon_index(ctx, index, &reports));
        }
    }
    reports
}

fn commit_destination(
    ctx: &SyncContext,
    class: ResourceClass,
    destination: &Path,
    inputs: &[(&SourceDescriptor, &SourceOutcome)],
) -> DestinationReport {
    let format = class.format();
    let mut sources: Vec<SourceReport> = inputs.iter().map(|(_, o)| o.report.clone()).collect();

    let mut upstream = Vec::new();
    let mut upstream_origins = Vec::new();
    let mut upstream_total = 0usize;
    let mut private = Vec::new();
    for (descriptor, outcome) in inputs {
        if !descriptor.private {
            upstream_total += 1;
        }
        let Some(normalized) = &outcome.normalized else {
            continue;
        };
        if descriptor.private {
            private.push(normalized.entries.clone());
        } else {
            upstream.push(MergeInput {
                priority: descriptor.priority,
                entries: normalized.entries.clone(),
            });
            upstream_origins.push(descriptor.origin.clone());
        }
    }

    if let Some((report, normalized)) = load_private_file(&ctx.root, class, destination) {
        sources.push(report);
        if let Some(normalized) = normalized {
            private.push(normalized.entries);
        }
    }

    let rel_path = Path::new(class.dir_name()).join(destination);
    let mut report = DestinationReport {
        path: rel_path.clone(),
        status: DestinationStatus::Unchanged,
        entries: 0,
        overridden: 0,
        sources,
        content_hash: None,
        diff: None,
    };

    // Writing without a broken override would silently drop local rules.
    let broken_private: Vec<String> = report
        .sources
        .iter()
        .filter(|s| s.private)
        .filter_map(|s| s.status.reason().map(|r| format!("{}: {r}", s.origin)))
        .collect();
    if !broken_private.is_empty() {
        let reason = format!("private override failed ({})", broken_private.join("; "));
        return failed(report, FailureKind::PrivateOverride, reason);
    }

    if upstream_total > 0 && upstream.is_empty() {
        let err = MergeError::AllUpstreamFailed {
            destination: rel_path,
            failed: upstream_total,
        };
        return failed(report, FailureKind::EmptyResult, err.to_string());
    }

    let merged = match merge(&rel_path, upstream, private) {
        Ok(merged) => merged,
        Err(err) => return failed(report, FailureKind::EmptyResult, err.to_string()),
    };
    report.entries = merged.entries.len();
    report.overridden = merged.overridden;
    tracing::debug!(
        path = %report.path.display(),
        entries = report.entries,
        hash = %merged.content_hash,
        "merged destination"
    );
    report.content_hash = Some(merged.content_hash);

    let rendered = match ctx.engine.render_entries(
        format,
        destination,
        &merged.entries,
        upstream_origins,
        ctx.registry.header().homepage.clone(),
    ) {
        Ok(bytes) => bytes,
        Err(err) => return failed(report, FailureKind::Render, err.to_string()),
    };

    let abs_path = destination_path_at(&ctx.root, class, destination);
    finish_commit(ctx, report, &abs_path, &rendered, format.is_text())
}

/// Commit `rendered` to `abs_path` and fill in status (and diff in diff mode).
fn finish_commit(
    ctx: &SyncContext,
    mut report: DestinationReport,
    abs_path: &Path,
    rendered: &[u8],
    is_text: bool,
) -> DestinationReport {
    if ctx.mode == Mode::Diff && is_text {
        match read_existing_or_empty(abs_path) {
            Ok(existing) => {
                report.diff =
                    unified_diff(&report.path, &existing, &String::from_utf8_lossy(rendered));
            }
            Err(err) => return failed(report, FailureKind::Commit, err.to_string()),
        }
    }

    let committer = Committer::new(ctx.mode != Mode::Write);
    match committer.commit(abs_path, rendered) {
        Ok(CommitOutcome::Updated) => report.status = DestinationStatus::Updated,
        Ok(CommitOutcome::Unchanged) => report.status = DestinationStatus::Unchanged,
        Ok(CommitOutcome::WouldUpdate) => report.status = DestinationStatus::WouldUpdate,
        Err(err) => return failed(report, FailureKind::Commit, err.to_string()),
    }
    report
}

fn failed(mut report: DestinationReport, kind: FailureKind, reason: String) -> DestinationReport {
    tracing::error!(path = %report.path.display(), reason = %reason, "destination failed");
    report.status = DestinationStatus::Failed { kind, reason };
    report
}

/// `<class>/private/<destination>`, if present, as an override source.
fn load_private_file(
    root: &Path,
    class: ResourceClass,
    destination: &Path,
) -> Option<(SourceReport, Option<Normalized>)> {
    let path = private_override_path_at(root, class, destination);
    let id = SourceId::from("private");
    let origin = path
        .strip_prefix(root)
        .unwrap_or(&path)
        .to_string_lossy()
        .replace('\\', "/");

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot read private override");
            let report = SourceReport {
                id,
                origin,
                private: true,
                status: SourceStatus::FetchFailed {
                    reason: format!("cannot read {}: {err}", path.display()),
                },
                fetched_at: None,
                content_hash: None,
            };
            return Some((report, None));
        }
    };

    let descriptor = SourceDescriptor {
        resource_class: class,
        id: id.clone(),
        origin: origin.clone(),
        destination: destination.to_path_buf(),
        format: class.format(),
        priority: i32::MAX,
        private: true,
    };
    let (status, normalized) = normalize_source(&id, &descriptor, &bytes);
    let report = SourceReport {
        id,
        origin,
        private: true,
        status,
        fetched_at: None,
        content_hash: Some(surge_core::digest::sha256_hex(&bytes)),
    };
    Some((report, normalized))
}

/// Regenerate the icon index over icon destinations present after this run.
fn commit_icon_index(
    ctx: &SyncContext,
    index: &IconIndexSettings,
    reports: &[DestinationReport],
) -> DestinationReport {
    let class = ResourceClass::Icons;
    let mut present: Vec<PathBuf> = Vec::new();
    for (destination, _) in group_by_destination(ctx.registry.list_sources(class)) {
        let rel = Path::new(class.dir_name()).join(&destination);
        let pending = reports
            .iter()
            .any(|r| r.path == rel && r.status == DestinationStatus::WouldUpdate);
        if pending || destination_path_at(&ctx.root, class, &destination).is_file() {
            present.push(destination);
        }
    }

    let rel_path = Path::new(class.dir_name()).join(&index.path);
    let report = DestinationReport {
        path: rel_path,
        status: DestinationStatus::Unchanged,
        entries: present.len(),
        overridden: 0,
        sources: Vec::new(),
        content_hash: None,
        diff: None,
    };

    let icon_index = IconIndex::new(&index.name, &index.description, &index.base_url, &present);
    let rendered = match icon_index.to_json() {
        Ok(text) => text,
        Err(err) => return failed(report, FailureKind::Render, err.to_string()),
    };
    let abs_path = class_dir_at(&ctx.root, class).join(&index.path);
    finish_commit(ctx, report, &abs_path, rendered.as_bytes(), true)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

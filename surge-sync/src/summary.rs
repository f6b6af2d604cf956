//! Run summaries: per-source and per-destination outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use surge_core::{ResourceClass, SourceId};

/// Outcome of fetching and normalizing one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok {
        entries: usize,
        rejected: usize,
        duplicates: usize,
    },
    FetchFailed {
        reason: String,
    },
    FormatError {
        reason: String,
    },
    /// Shutdown was requested before the fetch started.
    Cancelled,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceStatus::Ok { .. })
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            SourceStatus::Ok { .. } => None,
            SourceStatus::FetchFailed { reason } | SourceStatus::FormatError { reason } => {
                Some(reason.clone())
            }
            SourceStatus::Cancelled => Some("cancelled by shutdown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub id: SourceId,
    /// URL, or the local path of a `private/` override file.
    pub origin: String,
    pub private: bool,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub fetched_at: Option<DateTime<Utc>>,
    pub content_hash: Option<String>,
}

/// Why a destination failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Every upstream source failed or the merge was empty.
    EmptyResult,
    /// A private override (descriptor or `private/` file) could not be
    /// fetched or parsed; the destination is left as it was.
    PrivateOverride,
    Render,
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DestinationStatus {
    Updated,
    Unchanged,
    WouldUpdate,
    Failed { kind: FailureKind, reason: String },
}

impl DestinationStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, DestinationStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationReport {
    /// Relative to the working tree root, e.g. `rules/social/telegram.conf`.
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DestinationStatus,
    pub entries: usize,
    pub overridden: usize,
    pub sources: Vec<SourceReport>,
    /// SHA-256 over the merged entries, set once the merge succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Unified diff against the working tree (diff mode, text outputs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl DestinationReport {
    /// Sources that failed even though the destination may have succeeded.
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.status.is_ok())
    }
}

/// One resource class's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub resource_class: ResourceClass,
    pub destinations: Vec<DestinationReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub updated: usize,
    pub unchanged: usize,
    pub would_update: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for d in &self.destinations {
            match d.status {
                DestinationStatus::Updated => counts.updated += 1,
                DestinationStatus::Unchanged => counts.unchanged += 1,
                DestinationStatus::WouldUpdate => counts.would_update += 1,
                DestinationStatus::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.destinations.iter().any(|d| d.status.is_failed())
    }

    pub fn has_source_failures(&self) -> bool {
        self.destinations
            .iter()
            .any(|d| d.failed_sources().next().is_some())
    }
}

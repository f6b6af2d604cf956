//! # surge-sync
//!
//! Merge, commit and orchestration for the resource sync pipeline.
//!
//! [`Runner::run`] drives [`orchestrator::sync_class`] for each requested
//! resource class and returns a [`RunReport`]. Each class fetches and
//! normalizes its sources concurrently, merges per destination with
//! [`merger::merge`], renders, and writes through the hash-gated atomic
//! [`Committer`].

pub mod diff;
pub mod error;
pub mod merger;
pub mod orchestrator;
pub mod pipeline;
pub mod summary;
pub mod writer;

pub use error::{CommitError, MergeError, SyncError};
pub use merger::{merge, MergeInput, MergedResource};
pub use orchestrator::{sync_class, Mode, Shutdown, SyncContext};
pub use pipeline::{RunReport, Runner};
pub use summary::{
    Counts, DestinationReport, DestinationStatus, FailureKind, RunSummary, SourceReport,
    SourceStatus,
};
pub use writer::{CommitOutcome, Committer};

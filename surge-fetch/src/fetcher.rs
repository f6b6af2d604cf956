//! Fetcher: one source descriptor in, one [`FetchResult`] out.
//!
//! `fetch` never returns `Err` and never panics on network failure: every
//! outcome, including exhausted retries, is captured in the result so one
//! unreachable source cannot abort the others.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use surge_core::{digest::sha256_hex, FetchSettings, SourceDescriptor, SourceId};

use crate::error::{FetchError, FetchFailed};
use crate::retry::RetryPolicy;
use crate::transport::{Transport, UreqTransport};

/// Outcome of fetching one source.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source_id: SourceId,
    pub body: Result<Vec<u8>, FetchFailed>,
    pub fetched_at: DateTime<Utc>,
    /// SHA-256 of the body; `None` on failure.
    pub content_hash: Option<String>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        self.body.is_ok()
    }
}

/// Retrying fetcher over a shared [`Transport`].
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Production fetcher: `ureq` transport configured from `settings`.
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self::new(
            Arc::new(UreqTransport::new(settings)),
            RetryPolicy::from_settings(settings),
        )
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Retrieve `descriptor.origin`, retrying transient failures with backoff.
    pub fn fetch(&self, descriptor: &SourceDescriptor) -> FetchResult {
        let body = self.fetch_with_retry(descriptor);
        let content_hash = body.as_ref().ok().map(|b| sha256_hex(b));
        FetchResult {
            source_id: descriptor.id.clone(),
            body,
            fetched_at: Utc::now(),
            content_hash,
        }
    }

    fn fetch_with_retry(&self, descriptor: &SourceDescriptor) -> Result<Vec<u8>, FetchFailed> {
        let mut attempt = 1;
        loop {
            match self.transport.get(&descriptor.origin) {
                Ok(body) => {
                    tracing::debug!(
                        source = %descriptor.id,
                        attempt,
                        bytes = body.len(),
                        "fetched",
                    );
                    return Ok(body);
                }
                Err(err) if err.is_transient() && attempt < self.policy.attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::debug!(
                        source = %descriptor.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient fetch failure, retrying",
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(failed(attempt, err)),
            }
        }
    }
}

fn failed(attempts: u32, last: FetchError) -> FetchFailed {
    FetchFailed { attempts, last }
}

//! Error types for surge-fetch.

use thiserror::Error;

/// Failure of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// DNS failure, refused or reset connection.
    #[error("connection failed for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("TLS validation failed for {url}: {message}")]
    Tls { url: String, message: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Redirect loops, bad headers and other protocol violations.
    #[error("protocol error for {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("response body for {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("failed reading response body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt might succeed.
    ///
    /// Timeouts, connection failures, truncated bodies, 5xx, 408 and 429 are
    /// transient; everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Timeout { .. } | FetchError::Connection { .. } | FetchError::Body { .. } => {
                true
            }
            FetchError::Tls { .. }
            | FetchError::InvalidUrl { .. }
            | FetchError::Protocol { .. }
            | FetchError::TooLarge { .. } => false,
        }
    }
}

/// Terminal failure for one source: non-retryable, or retries exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch failed after {attempts} attempt(s): {last}")]
pub struct FetchFailed {
    pub attempts: u32,
    pub last: FetchError,
}

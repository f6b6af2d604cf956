//! # surge-fetch
//!
//! Retrieves raw upstream bytes for one source descriptor.
//!
//! [`Fetcher::fetch`] wraps a [`Transport`] (one GET attempt) in a bounded
//! [`RetryPolicy`] and always returns a [`FetchResult`]. Transient failures
//! (timeouts, connection errors, 5xx) are retried with exponential backoff;
//! everything else fails on the first attempt.

pub mod error;
pub mod fetcher;
pub mod retry;
pub mod transport;

pub use error::{FetchError, FetchFailed};
pub use fetcher::{FetchResult, Fetcher};
pub use retry::RetryPolicy;
pub use transport::{Transport, UreqTransport};

//! HTTP transport seam.
//!
//! [`Transport`] performs exactly one GET attempt; retry policy lives in
//! [`crate::fetcher`]. [`UreqTransport`] is the production implementation.

use std::io::Read;
use std::time::Duration;

use surge_core::FetchSettings;

use crate::error::FetchError;

/// One blocking GET attempt returning the full response body.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking `ureq` agent with a per-attempt timeout and a body size limit.
pub struct UreqTransport {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl UreqTransport {
    pub fn new(settings: &FetchSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(&settings.user_agent)
            .https_only(true)
            .build();
        Self {
            agent,
            max_bytes: settings.max_bytes,
        }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call().map_err(|e| classify(url, e))?;

        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::TimedOut {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Body {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if body.len() as u64 > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(body)
    }
}

/// Map a `ureq` error onto the transient / non-transient taxonomy.
fn classify(url: &str, err: ureq::Error) -> FetchError {
    let url = url.to_string();
    match err {
        ureq::Error::Status(status, _) => FetchError::Status { status, url },
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            let lowered = message.to_ascii_lowercase();
            match transport.kind() {
                ureq::ErrorKind::InvalidUrl
                | ureq::ErrorKind::UnknownScheme
                | ureq::ErrorKind::InsecureRequestHttpsOnly
                | ureq::ErrorKind::InvalidProxyUrl => FetchError::InvalidUrl { url, message },
                ureq::ErrorKind::Dns
                | ureq::ErrorKind::ConnectionFailed
                | ureq::ErrorKind::ProxyConnect
                | ureq::ErrorKind::Io => {
                    if lowered.contains("certificate") || lowered.contains("tls") {
                        FetchError::Tls { url, message }
                    } else if lowered.contains("timed out") || lowered.contains("timeout") {
                        FetchError::Timeout { url }
                    } else {
                        FetchError::Connection { url, message }
                    }
                }
                _ => FetchError::Protocol { url, message },
            }
        }
    }
}

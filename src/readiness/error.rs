// Error definitions for readiness probes and settings.

use std::io;
use std::time::Duration;

/// Failure of a single probe attempt.
///
/// Everything except `InvalidRequest` is transient: the prober keeps retrying
/// until the deadline fires and then reports the last one it saw.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("tcp connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("tcp connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("http request failed: {0}")]
    Http(#[source] hyper::Error),

    #[error("connection closed before a response was received")]
    ConnectionClosed,

    #[error("http request aborted")]
    Aborted,

    #[error("invalid request for url '{url}': {reason}")]
    InvalidRequest { url: String, reason: String },
}

impl ProbeError {
    /// Reports whether retrying the same attempt can ever succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProbeError::InvalidRequest { .. })
    }
}

/// Rejected probe settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

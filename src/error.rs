// Error taxonomy for upstream fetches and campaign dispatch

use thiserror::Error;

/// Errors produced while fetching data from the booking platform.
///
/// The split drives retry policy: `Transient` failures may be retried with
/// backoff by the orchestrator, `Permanent` failures skip the apartment.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transient fetch error: {0}")]
    Transient(String),

    #[error("permanent fetch error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    /// Classify an HTTP status line the way the upstream API uses it.
    /// 5xx is retryable; 429 and 401 are surfaced with their own messages
    /// because operators hit them for very different reasons.
    pub fn from_status(status: u16, endpoint: &str) -> Self {
        match status {
            429 => FetchError::Permanent(format!(
                "upstream rate limit exceeded on {} (HTTP 429)",
                endpoint
            )),
            401 => FetchError::Permanent(format!(
                "authentication failed on {} (HTTP 401): check API key",
                endpoint
            )),
            s if s >= 500 => FetchError::Transient(format!("HTTP {} on {}", s, endpoint)),
            s => FetchError::Permanent(format!("HTTP {} on {}", s, endpoint)),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            FetchError::Transient(format!("network error: {}", err))
        } else if let Some(status) = err.status() {
            FetchError::from_status(status.as_u16(), err.url().map_or("", |u| u.path()))
        } else {
            FetchError::Transient(format!("request error: {}", err))
        }
    }
}

/// Email dispatch failure for a single campaign target. Logged and collected,
/// never aborts the rest of the batch.
#[derive(Error, Debug)]
#[error("failed to send campaign to {recipient}: {reason}")]
pub struct SendError {
    pub recipient: String,
    pub reason: String,
}

/// Configuration loading failure.
#[derive(Error, Debug)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

pub type Result<T> = std::result::Result<T, FetchError>;

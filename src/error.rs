use std::time::Duration;

/// Failures reported by a session capability.
///
/// Only [`SyncError::AuthFailure`] aborts a run. Everything else is recovered
/// at the track, operation or playlist level and ends up in a report.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    AuthFailure(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("mutation failed: {0}")]
    MutationFailure(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailure(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_body() {
            return Self::Transient(err.to_string());
        }
        match err.status() {
            Some(status) if status.is_server_error() => Self::Transient(err.to_string()),
            _ => Self::Other(err.into()),
        }
    }
}

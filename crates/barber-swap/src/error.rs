use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("face-swap client is not configured: {0}")]
    Configuration(String),
    #[error("invalid swap request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("face-swap request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("remote model error: {0}")]
    RemoteModel(String),
    #[error("could not decode swap result: {0}")]
    Decode(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl SwapError {
    /// Classify a transport error, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Network(err.to_string())
        }
    }
}

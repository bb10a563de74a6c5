//! Detector client error types.

use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector configuration error: {0}")]
    Config(String),

    #[error("Detector timed out after {0} seconds")]
    Timeout(u64),

    #[error("Detector returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "status",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Network(_) => "network",
            Self::Io(_) => "io",
        }
    }
}

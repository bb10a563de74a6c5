//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during compression.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg binary not found: {0}")]
    FfmpegNotFound(PathBuf),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("File not visible after {attempts} attempts: {path}")]
    FileNotVisible { path: PathBuf, attempts: u32 },

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the input itself was at fault rather than the transcoder.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::FileNotVisible { .. })
    }
}

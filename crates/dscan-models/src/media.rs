//! Media kind classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kinds of media the upload pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Re-encoded with FFmpeg before detection
    Video,
    /// Resized and re-encoded as JPEG before detection
    Image,
}

impl MediaKind {
    /// Classify a MIME type by its primary component (`video/mp4` -> `Video`).
    pub fn from_mime(mime: &str) -> Result<Self, UnsupportedMediaType> {
        let primary = mime
            .split('/')
            .next()
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();

        primary
            .parse()
            .map_err(|_| UnsupportedMediaType(mime.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }

    /// MIME type of the artifact the compression stage produces for this kind.
    pub fn output_mime(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/mp4",
            MediaKind::Image => "image/jpeg",
        }
    }

    /// File extension of the compressed artifact.
    pub fn output_extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Image => "jpg",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = UnsupportedMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            _ => Err(UnsupportedMediaType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported media type: {0}")]
pub struct UnsupportedMediaType(pub String);

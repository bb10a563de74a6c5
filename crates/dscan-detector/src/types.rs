//! Detector service payloads not shared with the rest of the workspace.

use serde::Deserialize;

/// `GET /health` body.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok")
    }
}

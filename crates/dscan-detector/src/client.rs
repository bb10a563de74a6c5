//! Detector HTTP client.

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, warn};

use dscan_models::{DetectionResult, DetectorResponse, MediaKind};

use crate::error::{DetectorError, DetectorResult};
use crate::types::HealthResponse;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest error body (in characters) kept from a failed detector call.
const MAX_ERROR_BODY: usize = 512;

/// Detector endpoints and limits.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub video_url: String,
    pub image_url: String,
    pub timeout: Duration,
}

impl DetectorConfig {
    pub fn new(video_url: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            video_url: trim_base(video_url.into()),
            image_url: trim_base(image_url.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> DetectorResult<Self> {
        let video_url = required_env("VIDEO_DETECTOR_URL")?;
        let image_url = required_env("IMAGE_DETECTOR_URL")?;
        let timeout = std::env::var("DETECTOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self::new(video_url, image_url).with_timeout(Duration::from_secs(timeout)))
    }

    /// Base URL of the detector serving `kind`.
    pub fn base_url(&self, kind: MediaKind) -> &str {
        match kind {
            MediaKind::Video => &self.video_url,
            MediaKind::Image => &self.image_url,
        }
    }
}

fn required_env(key: &str) -> DetectorResult<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DetectorError::Config(format!("{} not set", key)))
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Client for the video and image detectors.
///
/// Calls are never retried: a detector failure fails the upload.
#[derive(Debug, Clone)]
pub struct DetectorClient {
    http: Client,
    config: DetectorConfig,
}

impl DetectorClient {
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DetectorError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> DetectorResult<Self> {
        Self::new(DetectorConfig::from_env()?)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Submit a file to the detector for `kind` and return its normalized verdict.
    pub async fn detect(
        &self,
        kind: MediaKind,
        path: &Path,
        file_name: &str,
    ) -> DetectorResult<DetectionResult> {
        let url = format!("{}/detect", self.config.base_url(kind));
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(kind.output_mime())
            .map_err(DetectorError::Network)?;
        let form = Form::new().part("file", part);

        debug!(url = %url, size, "Submitting file to detector");
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let raw: DetectorResponse = serde_json::from_slice(&body)
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;
        let result = DetectionResult::normalize(raw)
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;

        info!(
            kind = %kind,
            score = ?result.score,
            is_deepfake = result.is_deepfake,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Detector verdict received"
        );

        Ok(result)
    }

    /// Check whether the detector for `kind` reports healthy.
    pub async fn health_check(&self, kind: MediaKind) -> DetectorResult<bool> {
        let url = format!("{}/health", self.config.base_url(kind));

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let health: HealthResponse = response
                    .json()
                    .await
                    .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;
                Ok(health.is_healthy())
            }
            Ok(response) => {
                warn!("{} detector health check failed: {}", kind, response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("{} detector health check error: {}", kind, e);
                Ok(false)
            }
        }
    }

    fn classify(&self, error: reqwest::Error) -> DetectorError {
        if error.is_timeout() {
            DetectorError::Timeout(self.config.timeout.as_secs())
        } else {
            DetectorError::Network(error)
        }
    }
}

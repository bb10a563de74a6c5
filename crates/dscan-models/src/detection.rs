//! Detector response schemas and the canonical detection result.
//!
//! The video and image detectors answer with different JSON shapes. Everything
//! downstream of the detector client works with [`DetectionResult`], produced
//! by the single `From<DetectorResponse>` conversion below.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Raw response body from a detector service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DetectorResponse {
    /// Video detector: `{score, is_deepfake}`
    Video {
        #[serde(deserialize_with = "required_nullable")]
        #[schemars(with = "Option<f64>")]
        score: Option<f64>,
        is_deepfake: bool,
    },
    /// Image detector: `{probability, is_deepfake}`
    Image {
        #[serde(deserialize_with = "required_nullable")]
        #[schemars(with = "Option<f64>")]
        probability: Option<f64>,
        is_deepfake: bool,
    },
}

// Key must be present (so the variants stay distinguishable) but may be null.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)
}

/// Canonical detection outcome persisted and returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionResult {
    /// Likelihood in [0, 1] that the media is synthetic, if the detector reported one
    pub score: Option<f64>,
    pub is_deepfake: bool,
}

impl From<DetectorResponse> for DetectionResult {
    fn from(response: DetectorResponse) -> Self {
        match response {
            DetectorResponse::Video { score, is_deepfake } => Self { score, is_deepfake },
            DetectorResponse::Image {
                probability,
                is_deepfake,
            } => Self {
                score: probability,
                is_deepfake,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("Detector score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
}

impl DetectionResult {
    /// Normalize a detector response, rejecting scores outside [0, 1].
    pub fn normalize(response: DetectorResponse) -> Result<Self, DetectionError> {
        let result = Self::from(response);
        match result.score {
            Some(score) if !(0.0..=1.0).contains(&score) => {
                Err(DetectionError::ScoreOutOfRange(score))
            }
            _ => Ok(result),
        }
    }
}

//! Client for the external deepfake detection services.
//!
//! Two detector deployments exist, one per [`MediaKind`](dscan_models::MediaKind).
//! Both accept a multipart upload on `POST /detect`; their differing response
//! schemas are normalized into [`DetectionResult`](dscan_models::DetectionResult)
//! before anything leaves this crate.

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{DetectorClient, DetectorConfig};
pub use error::{DetectorError, DetectorResult};

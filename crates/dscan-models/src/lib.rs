//! Shared data models for the DeepScan relay.
//!
//! This crate provides Serde-serializable types for:
//! - Media kinds accepted by the upload pipeline
//! - Detector wire schemas and the canonical detection result
//! - Persisted file records and per-user aggregates
//! - Encoding defaults for the compression stage

pub mod detection;
pub mod encoding;
pub mod file_record;
pub mod media;

// Re-export common types
pub use detection::{DetectionError, DetectionResult, DetectorResponse};
pub use encoding::{ImageEncodingConfig, VideoEncodingConfig};
pub use file_record::{FileRecord, UserFiles};
pub use media::{MediaKind, UnsupportedMediaType};

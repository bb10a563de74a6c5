//! Axum HTTP API for media upload and deepfake scoring.
//!
//! This crate provides:
//! - `POST /upload`: compress, score, archive and record an uploaded file
//! - `GET /`: list the caller's scored files
//! - Firebase ID token verification
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::{ApiConfig, PipelineConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{PipelineError, UploadPipeline, UploadedFile};
pub use state::AppState;

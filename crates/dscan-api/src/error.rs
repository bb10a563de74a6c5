//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::services::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(PipelineError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

/// Body served in place of server-side error details in production.
pub const REDACTED_DETAIL: &str = "An internal error occurred";

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Response extension marking a body that carries server-side error detail.
#[derive(Debug, Clone, Copy)]
pub struct ServerErrorDetail;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        let mut response = (status, Json(ErrorResponse { detail })).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(ServerErrorDetail);
        }
        response
    }
}

/// Generic `{detail}` response for `status`.
pub fn redacted_response(status: StatusCode) -> Response {
    let detail = REDACTED_DETAIL.to_string();
    (status, Json(ErrorResponse { detail })).into_response()
}

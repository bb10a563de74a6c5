//! Upload and listing handlers.

use std::path::Path;
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use dscan_models::FileRecord;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::security::{clean_original_name, normalize_mime};
use crate::services::{PipelineError, UploadedFile};
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
    pub score: Option<f64>,
    pub is_deepfake: bool,
}

impl From<FileRecord> for UploadResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            message: "File uploaded and processed successfully".to_string(),
            file_name: record.file_name,
            file_url: record.file_url,
            score: record.score,
            is_deepfake: record.is_deepfake,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub message: String,
    pub files: Vec<FileRecord>,
}

/// `POST /upload`
///
/// The pipeline runs on its own task so that a client hanging up mid-request
/// does not interrupt an upload that is already being archived or recorded.
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let file = match multipart {
        Ok(multipart) => receive_file(multipart, &state.config.pipeline.upload_dir).await?,
        Err(rejection) => {
            debug!("Upload is not a multipart form: {}", rejection);
            None
        }
    };

    let pipeline = Arc::clone(&state.pipeline);
    let uid = user.uid;
    let outcome = tokio::spawn(async move { pipeline.handle_upload(&uid, file).await })
        .await
        .map_err(|e| PipelineError::Internal(format!("upload task failed: {}", e)))??;

    Ok(Json(UploadResponse::from(outcome.record)))
}

/// `GET /`
pub async fn list_files(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<FilesResponse>> {
    let user_files = state.files.get(&user.uid).await.map_err(|e| {
        error!(uid = %user.uid, "Failed to read file records: {}", e);
        ApiError::internal(format!("Failed to read file records: {}", e))
    })?;

    match user_files {
        Some(user_files) if !user_files.is_empty() => Ok(Json(FilesResponse {
            message: "Files retrieved successfully".to_string(),
            files: user_files.files,
        })),
        _ => Err(ApiError::not_found("No files found")),
    }
}

/// Spool the `file` field to a temp file in `dir`.
///
/// A missing or empty field yields `None`; other fields are skipped.
async fn receive_file(mut multipart: Multipart, dir: &Path) -> ApiResult<Option<UploadedFile>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        return spool_field(field, dir).await;
    }
    Ok(None)
}

async fn spool_field(mut field: Field<'_>, dir: &Path) -> ApiResult<Option<UploadedFile>> {
    let original_name = clean_original_name(field.file_name());
    let mime = normalize_mime(field.content_type());

    let (file, path) = tempfile::Builder::new()
        .prefix("dscan-upload-")
        .tempfile_in(dir)
        .map_err(|e| ApiError::internal(format!("Failed to create upload file: {}", e)))?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        size += chunk.len() as u64;
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write upload: {}", e)))?;
    drop(file);

    if size == 0 {
        debug!(file_name = %original_name, "Empty file field");
        return Ok(None);
    }

    debug!(file_name = %original_name, mime = %mime, size, "Upload received");

    Ok(Some(UploadedFile {
        original_name,
        mime,
        path,
        size,
    }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        debug!("Malformed multipart body: {}", err);
        ApiError::from(PipelineError::NoFile)
    }
}

//! Upload orchestration.
//!
//! One upload runs these stages strictly in order:
//! visibility check, classification, compression, detection, archive,
//! persistence. Every temporary file is held as a [`TempPath`] owned by this
//! module, so each one is removed either explicitly at the stage that
//! consumes it or when the owning value is dropped on an error path.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

use dscan_detector::DetectorError;
use dscan_firestore::FirestoreError;
use dscan_media::{close_temp_path, wait_until_visible, CompressedArtifact, MediaError, MediaResult};
use dscan_models::{DetectionResult, FileRecord, MediaKind, UnsupportedMediaType, UserFiles};
use dscan_storage::{ArchivedObject, StorageError, StorageResult};

use crate::config::PipelineConfig;
use crate::metrics;

/// Kind-specific compression.
#[async_trait]
pub trait MediaCompressor: Send + Sync {
    async fn compress(&self, kind: MediaKind, input: &Path) -> MediaResult<CompressedArtifact>;
}

/// Scores a compressed file.
#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn detect(
        &self,
        kind: MediaKind,
        path: &Path,
        file_name: &str,
    ) -> Result<DetectionResult, DetectorError>;
}

/// Durable public storage for processed files.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    async fn archive(
        &self,
        path: &Path,
        uid: &str,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<ArchivedObject>;
}

/// Per-user file record persistence.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Create the user's aggregate if needed and append `record`.
    async fn append(&self, uid: &str, record: &FileRecord) -> Result<(), FirestoreError>;

    async fn get(&self, uid: &str) -> Result<Option<UserFiles>, FirestoreError>;
}

/// A file received from the client, spooled to disk.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied name, already stripped of path components
    pub original_name: String,
    /// Client-declared MIME type
    pub mime: String,
    pub path: TempPath,
    pub size: u64,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub record: FileRecord,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No file uploaded")]
    NoFile,

    #[error(transparent)]
    UnsupportedMediaType(#[from] UnsupportedMediaType),

    #[error("Uploaded file is not available: {0}")]
    FileNotVisible(String),

    #[error("Compression failed: {0}")]
    Compression(#[source] MediaError),

    #[error("Detection failed: {0}")]
    Detection(#[source] DetectorError),

    #[error("Archive failed: {0}")]
    Archive(#[source] StorageError),

    #[error("Failed to save file record: {source}")]
    Persistence {
        /// Public URL of the object that was archived but not recorded
        url: String,
        #[source]
        source: FirestoreError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether the request itself was at fault (400) rather than a collaborator (500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NoFile | Self::UnsupportedMediaType(_) | Self::FileNotVisible(_)
        )
    }

    /// Metrics/log label for where the upload stopped.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NoFile => "no_file",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::FileNotVisible(_) => "file_not_visible",
            Self::Compression(_) => "compress",
            Self::Detection(_) => "detect",
            Self::Archive(_) => "archive",
            Self::Persistence { .. } => "persist",
            Self::Internal(_) => "internal",
        }
    }
}

/// Drives one upload through every stage.
pub struct UploadPipeline {
    compressor: Arc<dyn MediaCompressor>,
    detector: Arc<dyn DetectionService>,
    archive: Arc<dyn ArchiveService>,
    store: Arc<dyn FileRecordStore>,
    visibility_attempts: u32,
    visibility_delay: Duration,
}

impl UploadPipeline {
    pub fn new(
        config: &PipelineConfig,
        compressor: Arc<dyn MediaCompressor>,
        detector: Arc<dyn DetectionService>,
        archive: Arc<dyn ArchiveService>,
        store: Arc<dyn FileRecordStore>,
    ) -> Self {
        Self {
            compressor,
            detector,
            archive,
            store,
            visibility_attempts: config.visibility_attempts,
            visibility_delay: config.visibility_delay,
        }
    }

    /// Process an upload for `uid`.
    ///
    /// On success exactly one [`FileRecord`] has been appended. On failure
    /// none has, and every temporary file of this request is gone.
    pub async fn handle_upload(
        &self,
        uid: &str,
        file: Option<UploadedFile>,
    ) -> Result<UploadOutcome, PipelineError> {
        let started = Instant::now();
        let mut kind_label = "unknown";

        let result = async {
            let file = file.ok_or(PipelineError::NoFile)?;

            wait_until_visible(&file.path, self.visibility_attempts, self.visibility_delay)
                .await
                .map_err(|e| PipelineError::FileNotVisible(e.to_string()))?;

            let kind = MediaKind::from_mime(&file.mime)?;
            kind_label = kind.as_str();

            let span = info_span!(
                "upload",
                uid = %uid,
                kind = %kind,
                file_name = %file.original_name,
                size = file.size
            );
            self.process(uid, kind, file).instrument(span).await
        }
        .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.stage(),
        };
        metrics::record_upload(kind_label, outcome, started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            if e.is_client_error() {
                info!(uid = %uid, "Upload rejected: {}", e);
            } else {
                error!(uid = %uid, stage = e.stage(), "Upload failed: {}", e);
            }
        }

        result
    }

    async fn process(
        &self,
        uid: &str,
        kind: MediaKind,
        file: UploadedFile,
    ) -> Result<UploadOutcome, PipelineError> {
        let UploadedFile {
            original_name,
            path: input,
            ..
        } = file;

        let stage = Instant::now();
        let artifact = self
            .compressor
            .compress(kind, &input)
            .await
            .map_err(PipelineError::Compression)?;
        metrics::record_stage("compress", kind.as_str(), stage.elapsed().as_secs_f64());

        // The original is not needed past this point
        close_temp_path(input, "uploaded file");

        let detector_name = artifact_name(&original_name, kind);
        let stage = Instant::now();
        let detection = self
            .detector
            .detect(kind, &artifact.path, &detector_name)
            .await
            .map_err(PipelineError::Detection)?;
        metrics::record_stage("detect", kind.as_str(), stage.elapsed().as_secs_f64());

        let stage = Instant::now();
        let archived = self
            .archive
            .archive(&artifact.path, uid, &detector_name, artifact.mime())
            .await
            .map_err(PipelineError::Archive)?;
        metrics::record_stage("archive", kind.as_str(), stage.elapsed().as_secs_f64());

        close_temp_path(artifact.path, "compressed artifact");

        let record = FileRecord::new(original_name, archived.url.clone(), detection);

        let stage = Instant::now();
        if let Err(source) = self.store.append(uid, &record).await {
            warn!(
                key = %archived.key,
                url = %archived.url,
                "Archived object has no file record"
            );
            return Err(PipelineError::Persistence {
                url: archived.url,
                source,
            });
        }
        metrics::record_stage("persist", kind.as_str(), stage.elapsed().as_secs_f64());

        info!(
            url = %record.file_url,
            score = ?record.score,
            is_deepfake = record.is_deepfake,
            "Upload processed"
        );

        Ok(UploadOutcome { record })
    }
}

/// Name for the compressed artifact: original stem with the output extension.
fn artifact_name(original: &str, kind: MediaKind) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    format!("{}.{}", stem, kind.output_extension())
}

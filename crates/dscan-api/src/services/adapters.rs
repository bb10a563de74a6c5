//! Bindings from the pipeline's collaborator traits to the concrete clients.

use std::path::Path;

use async_trait::async_trait;

use dscan_detector::{DetectorClient, DetectorError};
use dscan_firestore::{FirestoreError, UserFilesRepository};
use dscan_media::{CompressedArtifact, Compressor, MediaResult};
use dscan_models::{DetectionResult, FileRecord, MediaKind, UserFiles};
use dscan_storage::{ArchivedObject, R2Client, StorageResult};

use crate::handlers::health::DependencyCheck;
use crate::services::upload::{ArchiveService, DetectionService, FileRecordStore, MediaCompressor};

#[async_trait]
impl MediaCompressor for Compressor {
    async fn compress(&self, kind: MediaKind, input: &Path) -> MediaResult<CompressedArtifact> {
        Compressor::compress(self, kind, input).await
    }
}

#[async_trait]
impl DetectionService for DetectorClient {
    async fn detect(
        &self,
        kind: MediaKind,
        path: &Path,
        file_name: &str,
    ) -> Result<DetectionResult, DetectorError> {
        DetectorClient::detect(self, kind, path, file_name).await
    }
}

#[async_trait]
impl ArchiveService for R2Client {
    async fn archive(
        &self,
        path: &Path,
        uid: &str,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<ArchivedObject> {
        self.archive_file(path, uid, file_name, content_type).await
    }
}

#[async_trait]
impl FileRecordStore for UserFilesRepository {
    async fn append(&self, uid: &str, record: &FileRecord) -> Result<(), FirestoreError> {
        UserFilesRepository::append(self, uid, record).await
    }

    async fn get(&self, uid: &str) -> Result<Option<UserFiles>, FirestoreError> {
        UserFilesRepository::get(self, uid).await
    }
}

/// Firestore reachability: a point read that may legitimately find nothing.
pub struct FirestoreProbe(pub UserFilesRepository);

#[async_trait]
impl DependencyCheck for FirestoreProbe {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn check(&self) -> Result<(), String> {
        self.0
            .client()
            .get_document("_health", "_check")
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct StorageProbe(pub R2Client);

#[async_trait]
impl DependencyCheck for StorageProbe {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn check(&self) -> Result<(), String> {
        self.0.check_connectivity().await.map_err(|e| e.to_string())
    }
}

/// Health of one detector deployment.
pub struct DetectorProbe {
    pub client: DetectorClient,
    pub kind: MediaKind,
}

#[async_trait]
impl DependencyCheck for DetectorProbe {
    fn name(&self) -> &'static str {
        match self.kind {
            MediaKind::Video => "video_detector",
            MediaKind::Image => "image_detector",
        }
    }

    async fn check(&self) -> Result<(), String> {
        match self.client.health_check(self.kind).await {
            Ok(true) => Ok(()),
            Ok(false) => Err("detector reported unhealthy".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

pub struct FfmpegProbe(pub Compressor);

#[async_trait]
impl DependencyCheck for FfmpegProbe {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn check(&self) -> Result<(), String> {
        self.0.check_ffmpeg().map(|_| ()).map_err(|e| e.to_string())
    }
}

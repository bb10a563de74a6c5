//! Application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use dscan_detector::DetectorClient;
use dscan_firestore::{FirestoreClient, UserFilesRepository};
use dscan_media::fs_utils::ensure_dir;
use dscan_media::{CompressionConfig, Compressor};
use dscan_models::MediaKind;
use dscan_storage::R2Client;

use crate::auth::{JwksCache, TokenVerifier};
use crate::config::ApiConfig;
use crate::handlers::health::DependencyCheck;
use crate::services::adapters::{DetectorProbe, FfmpegProbe, FirestoreProbe, StorageProbe};
use crate::services::{FileRecordStore, UploadPipeline};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<UploadPipeline>,
    /// Read side of the file records, used by the listing endpoint
    pub files: Arc<dyn FileRecordStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub checks: Arc<Vec<Arc<dyn DependencyCheck>>>,
}

impl AppState {
    /// Connect every collaborator from the environment.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let upload_dir = ensure_dir(&config.pipeline.upload_dir)
            .await
            .with_context(|| {
                format!(
                    "creating upload directory {}",
                    config.pipeline.upload_dir.display()
                )
            })?;

        let compressor = Compressor::new(CompressionConfig::from_env(), upload_dir);
        match compressor.check_ffmpeg() {
            Ok(path) => info!("Using ffmpeg at {}", path.display()),
            Err(e) => tracing::warn!("ffmpeg unavailable, video uploads will fail: {}", e),
        }

        let detector = DetectorClient::from_env().context("configuring detector client")?;
        let storage = R2Client::from_env().await.context("configuring R2 client")?;
        let firestore = FirestoreClient::from_env()
            .await
            .context("configuring Firestore client")?;
        let repository = UserFilesRepository::new(firestore);
        let verifier = JwksCache::from_env().await.context("loading Firebase JWKS")?;

        let checks: Vec<Arc<dyn DependencyCheck>> = vec![
            Arc::new(FirestoreProbe(repository.clone())),
            Arc::new(StorageProbe(storage.clone())),
            Arc::new(DetectorProbe {
                client: detector.clone(),
                kind: MediaKind::Video,
            }),
            Arc::new(DetectorProbe {
                client: detector.clone(),
                kind: MediaKind::Image,
            }),
            Arc::new(FfmpegProbe(compressor.clone())),
        ];

        let store: Arc<dyn FileRecordStore> = Arc::new(repository);
        let pipeline = UploadPipeline::new(
            &config.pipeline,
            Arc::new(compressor),
            Arc::new(detector),
            Arc::new(storage),
            Arc::clone(&store),
        );

        Ok(Self::from_parts(
            config,
            pipeline,
            store,
            Arc::new(verifier),
            checks,
        ))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: ApiConfig,
        pipeline: UploadPipeline,
        files: Arc<dyn FileRecordStore>,
        verifier: Arc<dyn TokenVerifier>,
        checks: Vec<Arc<dyn DependencyCheck>>,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            files,
            verifier,
            checks: Arc::new(checks),
        }
    }
}

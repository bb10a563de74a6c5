//! In-memory collaborators for pipeline and router tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use dscan_api::auth::{AuthUser, TokenVerifier};
use dscan_api::config::{ApiConfig, PipelineConfig};
use dscan_api::handlers::health::DependencyCheck;
use dscan_api::services::{
    ArchiveService, DetectionService, FileRecordStore, MediaCompressor, UploadPipeline,
    UploadedFile,
};
use dscan_api::{ApiError, AppState};
use dscan_detector::DetectorError;
use dscan_firestore::FirestoreError;
use dscan_media::fs_utils::new_temp_path;
use dscan_media::{CompressedArtifact, MediaError, MediaResult};
use dscan_models::{DetectionResult, FileRecord, MediaKind, UserFiles};
use dscan_storage::{ArchivedObject, StorageError, StorageResult};

/// Accepts `token-<uid>` as the bearer for `<uid>`.
pub struct PrefixVerifier;

#[async_trait]
impl TokenVerifier for PrefixVerifier {
    async fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        token
            .strip_prefix("token-")
            .filter(|uid| !uid.is_empty())
            .map(|uid| AuthUser {
                uid: uid.to_string(),
                email: None,
            })
            .ok_or_else(|| ApiError::unauthorized("bad token"))
    }
}

/// Artifact path to the upload it was made from.
pub type SourceMap = Arc<Mutex<HashMap<PathBuf, PathBuf>>>;

/// Writes a small artifact next to the input, or fails.
pub struct FakeCompressor {
    pub work_dir: PathBuf,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub sources: SourceMap,
}

#[async_trait]
impl MediaCompressor for FakeCompressor {
    async fn compress(&self, kind: MediaKind, input: &Path) -> MediaResult<CompressedArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = new_temp_path(&self.work_dir, kind.output_extension())?;
        if self.fail {
            return Err(MediaError::ffmpeg_failed("encoder exited", None, Some(1)));
        }
        let bytes = tokio::fs::read(input).await?;
        tokio::fs::write(&output, &bytes).await?;
        self.sources
            .lock()
            .unwrap()
            .insert(output.to_path_buf(), input.to_path_buf());
        Ok(CompressedArtifact {
            path: output,
            kind,
            size: bytes.len() as u64,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub enum DetectorMode {
    Ok(f64),
    Timeout,
    Status(u16),
}

pub struct FakeDetector {
    pub mode: DetectorMode,
    pub calls: AtomicUsize,
    /// File names submitted, in order
    pub seen: Mutex<Vec<String>>,
    pub sources: SourceMap,
}

#[async_trait]
impl DetectionService for FakeDetector {
    async fn detect(
        &self,
        _kind: MediaKind,
        path: &Path,
        file_name: &str,
    ) -> Result<DetectionResult, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "artifact must exist while being scored");
        let source = self.sources.lock().unwrap().get(path).cloned();
        let source = source.expect("artifact was produced by the compressor");
        assert!(
            !source.exists(),
            "original upload {} must be deleted before detection",
            source.display()
        );
        self.seen.lock().unwrap().push(file_name.to_string());
        match self.mode {
            DetectorMode::Ok(score) => Ok(DetectionResult {
                score: Some(score),
                is_deepfake: score >= 0.5,
            }),
            DetectorMode::Timeout => Err(DetectorError::Timeout(30)),
            DetectorMode::Status(status) => Err(DetectorError::Status {
                status,
                body: "unavailable".to_string(),
            }),
        }
    }
}

pub struct FakeArchive {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ArchiveService for FakeArchive {
    async fn archive(
        &self,
        path: &Path,
        uid: &str,
        file_name: &str,
        _content_type: &str,
    ) -> StorageResult<ArchivedObject> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(path.exists(), "artifact must exist while being archived");
        if self.fail {
            return Err(StorageError::upload_failed("bucket unreachable"));
        }
        let key = format!("uploads/{}/{}-{}", uid, n, file_name);
        Ok(ArchivedObject {
            url: format!("https://files.example.com/{}", key),
            key,
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub fail_writes: bool,
    pub docs: Mutex<HashMap<String, UserFiles>>,
}

impl MemoryStore {
    pub fn record_count(&self) -> usize {
        self.docs.lock().unwrap().values().map(|u| u.files.len()).sum()
    }
}

#[async_trait]
impl FileRecordStore for MemoryStore {
    async fn append(&self, uid: &str, record: &FileRecord) -> Result<(), FirestoreError> {
        if self.fail_writes {
            return Err(FirestoreError::from_http_status(503, "backend unavailable"));
        }
        // Yield so concurrent appends interleave
        tokio::task::yield_now().await;
        self.docs
            .lock()
            .unwrap()
            .entry(uid.to_string())
            .or_insert_with(|| UserFiles::new(uid))
            .files
            .push(record.clone());
        Ok(())
    }

    async fn get(&self, uid: &str) -> Result<Option<UserFiles>, FirestoreError> {
        Ok(self.docs.lock().unwrap().get(uid).cloned())
    }
}

pub struct AlwaysOk(pub &'static str);

#[async_trait]
impl DependencyCheck for AlwaysOk {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Knobs for building a harness.
#[derive(Clone, Copy)]
pub struct Faults {
    pub compress: bool,
    pub detector: DetectorMode,
    pub archive: bool,
    pub persist: bool,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            compress: false,
            detector: DetectorMode::Ok(0.83),
            archive: false,
            persist: false,
        }
    }
}

/// One pipeline wired to fakes over a private upload directory.
pub struct Harness {
    pub dir: TempDir,
    pub compressor: Arc<FakeCompressor>,
    pub detector: Arc<FakeDetector>,
    pub archive: Arc<FakeArchive>,
    pub store: Arc<MemoryStore>,
    pub config: PipelineConfig,
}

impl Harness {
    pub fn new(faults: Faults) -> Self {
        let dir = TempDir::new().unwrap();
        let sources = SourceMap::default();
        let config = PipelineConfig {
            upload_dir: dir.path().to_path_buf(),
            visibility_attempts: 2,
            visibility_delay: Duration::from_millis(5),
        };
        Self {
            compressor: Arc::new(FakeCompressor {
                work_dir: dir.path().to_path_buf(),
                fail: faults.compress,
                calls: AtomicUsize::new(0),
                sources: sources.clone(),
            }),
            detector: Arc::new(FakeDetector {
                mode: faults.detector,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                sources,
            }),
            archive: Arc::new(FakeArchive {
                fail: faults.archive,
                calls: AtomicUsize::new(0),
            }),
            store: Arc::new(MemoryStore {
                fail_writes: faults.persist,
                ..Default::default()
            }),
            config,
            dir,
        }
    }

    pub fn pipeline(&self) -> UploadPipeline {
        UploadPipeline::new(
            &self.config,
            self.compressor.clone(),
            self.detector.clone(),
            self.archive.clone(),
            self.store.clone(),
        )
    }

    pub fn state(&self) -> AppState {
        self.state_in("development")
    }

    pub fn state_in(&self, environment: &str) -> AppState {
        let config = ApiConfig {
            rate_limit_rps: 1000,
            metrics_enabled: false,
            environment: environment.to_string(),
            pipeline: self.config.clone(),
            ..ApiConfig::default()
        };
        let checks: Vec<Arc<dyn DependencyCheck>> =
            vec![Arc::new(AlwaysOk("firestore")), Arc::new(AlwaysOk("storage"))];
        AppState::from_parts(
            config,
            self.pipeline(),
            self.store.clone(),
            Arc::new(PrefixVerifier),
            checks,
        )
    }

    /// Spool `bytes` into the upload directory as the HTTP layer would.
    pub fn uploaded(&self, name: &str, mime: &str, bytes: &[u8]) -> UploadedFile {
        let file = tempfile::Builder::new()
            .prefix("dscan-upload-")
            .tempfile_in(self.dir.path())
            .unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        UploadedFile {
            original_name: name.to_string(),
            mime: mime.to_string(),
            path: file.into_temp_path(),
            size: bytes.len() as u64,
        }
    }

    /// Files currently left in the upload directory.
    pub fn leftover_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}

//! R2 client implementation.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::{archive_key, ArchivedObject};
use crate::error::{StorageError, StorageResult};

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for R2 client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL objects are served from
    pub public_url: String,
    /// Whether to issue `PutObjectAcl(public-read)` after upload
    pub public_acl: bool,
    pub timeout: Duration,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_url: required("R2_PUBLIC_URL")?.trim_end_matches('/').to_string(),
            public_acl: std::env::var("R2_PUBLIC_ACL")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            timeout: Duration::from_secs(
                std::env::var("R2_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        })
    }
}

fn required(key: &str) -> StorageResult<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{} not set", key)))
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_url: String,
    public_acl: bool,
}

impl R2Client {
    /// Create a new R2 client from configuration.
    pub async fn new(config: R2Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.timeout)
            .build();

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_url: config.public_url.trim_end_matches('/').to_string(),
            public_acl: config.public_acl,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(R2Config::from_env()?).await
    }

    /// Upload a file to R2.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Grant anonymous read access to an object.
    pub async fn make_public(&self, key: &str) -> StorageResult<()> {
        self.client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::AclFailed(e.to_string()))?;
        Ok(())
    }

    /// Delete a single object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
        Ok(())
    }

    /// Public URL of `key`.
    pub fn public_url(&self, key: &str) -> String {
        public_url_for(&self.public_url, key)
    }

    /// Store a processed upload and return where it can be fetched.
    ///
    /// An object whose ACL cannot be set is deleted again, so a failed
    /// archive never leaves a private orphan behind.
    pub async fn archive_file(
        &self,
        path: &Path,
        uid: &str,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<ArchivedObject> {
        let key = archive_key(
            uid,
            file_name,
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4(),
        )?;

        self.upload_file(path, &key, content_type).await?;

        if self.public_acl {
            if let Err(e) = self.make_public(&key).await {
                if let Err(delete_err) = self.delete_object(&key).await {
                    warn!(key = %key, "Failed to remove object after ACL error: {}", delete_err);
                }
                return Err(e);
            }
        }

        let url = self.public_url(&key);
        info!(key = %key, url = %url, "Archived upload");
        Ok(ArchivedObject { key, url })
    }

    /// Check R2 connectivity by performing a HEAD request on the bucket.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

/// Join a public base URL and an object key, percent-encoding each segment.
pub(crate) fn public_url_for(base: &str, key: &str) -> String {
    let path = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base.trim_end_matches('/'), path)
}

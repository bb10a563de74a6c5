//! Persisted upload outcomes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionResult;

/// One processed upload, appended to the owner's [`UserFiles`].
///
/// Field names match the documents written by earlier deployments, which mix
/// camelCase with `is_deepfake`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileRecord {
    #[serde(rename = "fileName")]
    pub file_name: String,

    #[serde(rename = "fileUrl")]
    pub file_url: String,

    pub score: Option<f64>,

    pub is_deepfake: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record for an archived, scored file, stamped with the current time.
    pub fn new(
        file_name: impl Into<String>,
        file_url: impl Into<String>,
        detection: DetectionResult,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            file_url: file_url.into(),
            score: detection.score,
            is_deepfake: detection.is_deepfake,
            created_at: Utc::now(),
        }
    }
}

/// All file records of one user, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserFiles {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(default)]
    pub files: Vec<FileRecord>,
}

impl UserFiles {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

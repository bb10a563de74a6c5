//! Persistence of per-user file records.
//!
//! Each user owns one document in `user_files`, keyed by uid:
//! `{ userId, files: [FileRecord...] }`. Appends are a single commit that
//! upserts `userId` and appends to `files` server-side, so concurrent uploads
//! by the same user never overwrite each other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use dscan_models::{FileRecord, UserFiles};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    Document, DocumentMask, FieldTransform, FromFirestoreValue, ToFirestoreValue, Value, Write,
};

pub const USER_FILES_COLLECTION: &str = "user_files";

const FIELD_USER_ID: &str = "userId";
const FIELD_FILES: &str = "files";

/// Repository for [`UserFiles`] aggregates.
#[derive(Clone)]
pub struct UserFilesRepository {
    client: FirestoreClient,
    collection: String,
}

impl UserFilesRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self {
            client,
            collection: USER_FILES_COLLECTION.to_string(),
        }
    }

    /// Use a different collection, e.g. per test run.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    /// Create the user's aggregate if needed and append `record` to it.
    pub async fn append(&self, uid: &str, record: &FileRecord) -> FirestoreResult<()> {
        let write = self.append_write(uid, record);
        let response = self.client.commit(&self.collection, vec![write]).await?;

        debug!(
            uid = %uid,
            commit_time = ?response.commit_time,
            "Appended file record"
        );
        Ok(())
    }

    /// Load the user's aggregate, `None` if they never uploaded.
    pub async fn get(&self, uid: &str) -> FirestoreResult<Option<UserFiles>> {
        let Some(doc) = self.client.get_document(&self.collection, uid).await? else {
            return Ok(None);
        };
        Ok(Some(user_files_from_document(uid, &doc)?))
    }

    fn append_write(&self, uid: &str, record: &FileRecord) -> Write {
        let name = self.client.full_document_name(&self.collection, uid);
        let fields = HashMap::from([(FIELD_USER_ID.to_string(), uid.to_firestore_value())]);

        Write {
            update: Some(Document::named(name, fields)),
            update_mask: Some(DocumentMask {
                field_paths: vec![FIELD_USER_ID.to_string()],
            }),
            update_transforms: vec![FieldTransform::append(
                FIELD_FILES,
                vec![record_to_value(record)],
            )],
        }
    }
}

/// Encode a record as a Firestore map using its persisted field names.
pub fn record_to_value(record: &FileRecord) -> Value {
    Value::map(HashMap::from([
        ("fileName".to_string(), record.file_name.to_firestore_value()),
        ("fileUrl".to_string(), record.file_url.to_firestore_value()),
        ("score".to_string(), record.score.to_firestore_value()),
        ("is_deepfake".to_string(), record.is_deepfake.to_firestore_value()),
        ("createdAt".to_string(), record.created_at.to_firestore_value()),
    ]))
}

/// Decode a record map. Returns `None` if a required field is missing.
pub fn record_from_value(value: &Value) -> Option<FileRecord> {
    let fields = value.as_map()?;
    let get = |key: &str| fields.get(key);

    Some(FileRecord {
        file_name: String::from_firestore_value(get("fileName")?)?,
        file_url: String::from_firestore_value(get("fileUrl")?)?,
        score: get("score").and_then(f64::from_firestore_value),
        is_deepfake: bool::from_firestore_value(get("is_deepfake")?)?,
        created_at: get("createdAt")
            .and_then(DateTime::<Utc>::from_firestore_value)
            .unwrap_or_default(),
    })
}

fn user_files_from_document(uid: &str, doc: &Document) -> FirestoreResult<UserFiles> {
    let user_id = doc
        .field(FIELD_USER_ID)
        .and_then(String::from_firestore_value)
        .unwrap_or_else(|| uid.to_string());

    let entries = match doc.field(FIELD_FILES) {
        None => &[][..],
        Some(value) => value.as_array().ok_or_else(|| {
            FirestoreError::InvalidResponse(format!("{}: files is not an array", uid))
        })?,
    };

    let mut files = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match record_from_value(entry) {
            Some(record) => files.push(record),
            None => warn!(uid = %uid, index, "Skipping malformed file record"),
        }
    }

    Ok(UserFiles { user_id, files })
}

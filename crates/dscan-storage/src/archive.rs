//! Object key layout for archived uploads.

use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Longest file name component kept in a key.
const MAX_NAME_LEN: usize = 128;

/// Where an archived upload lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedObject {
    pub key: String,
    /// Public URL for the object
    pub url: String,
}

/// Reduce a client-supplied file name to a safe key component.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` become `_`; leading
/// dots are stripped so the result can never be `..` or a hidden file.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    let mut result: String = trimmed.chars().take(MAX_NAME_LEN).collect();
    if result.is_empty() {
        result.push_str("file");
    }
    result
}

/// Build `uploads/{uid}/{timestamp_ms}-{id}-{sanitized_name}`.
///
/// `id` keeps keys distinct when one user sends the same name twice within
/// a millisecond.
pub fn archive_key(
    uid: &str,
    file_name: &str,
    timestamp_ms: i64,
    id: Uuid,
) -> StorageResult<String> {
    if uid.is_empty() || uid.contains(['/', '\\']) || uid.contains("..") {
        return Err(StorageError::InvalidKey(format!("invalid user id: {:?}", uid)));
    }

    Ok(format!(
        "uploads/{}/{}-{}-{}",
        uid,
        timestamp_ms,
        id.simple(),
        sanitize_file_name(file_name)
    ))
}

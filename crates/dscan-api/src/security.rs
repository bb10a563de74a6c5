//! Input sanitization for client-supplied upload metadata.

/// Longest file name kept from the client.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

const FALLBACK_FILE_NAME: &str = "upload";

/// Reduce a client-declared file name to a safe display name.
///
/// Keeps only the last path component (either separator), drops control
/// characters and caps the length. Never returns an empty string.
pub fn clean_original_name(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILE_NAME_LENGTH)
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// MIME type without parameters, lowercased.
pub fn normalize_mime(content_type: Option<&str>) -> String {
    content_type
        .unwrap_or("application/octet-stream")
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

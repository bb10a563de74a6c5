//! Cloudflare R2 archive for processed uploads.
//!
//! Objects are written under `uploads/{uid}/`, made publicly readable and
//! addressed through the bucket's public domain.

pub mod archive;
pub mod client;
pub mod error;

pub use archive::{archive_key, sanitize_file_name, ArchivedObject};
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};

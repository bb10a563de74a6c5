//! Firestore REST API client.
//!
//! Provides the document reads and atomic commits used to persist
//! [`UserFiles`](dscan_models::UserFiles) aggregates.

pub mod client;
pub mod error;
pub mod metrics;
pub mod token_cache;
pub mod types;
pub mod user_files_repo;


pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use types::{Document, FieldTransform, Value, Write};
pub use user_files_repo::{UserFilesRepository, USER_FILES_COLLECTION};

//! Business logic services.

pub mod adapters;
pub mod upload;

pub use upload::{
    ArchiveService, DetectionService, FileRecordStore, MediaCompressor, PipelineError,
    UploadOutcome, UploadPipeline, UploadedFile,
};

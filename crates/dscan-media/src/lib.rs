//! Compression stage for uploaded media.
//!
//! Videos are re-encoded with the FFmpeg CLI; images are resized and
//! re-encoded as JPEG with the `image` crate. Every output is written to a
//! scoped temporary path that is removed when dropped.

pub mod command;
pub mod compressor;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod raster;
pub mod progress;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use compressor::{CompressedArtifact, Compressor};
pub use config::CompressionConfig;
pub use error::{MediaError, MediaResult};
pub use fs_utils::{close_temp_path, wait_until_visible};
pub use progress::FfmpegProgress;

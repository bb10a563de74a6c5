//! Kind-specific compression of uploaded files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempPath;
use tracing::{debug, info};

use dscan_models::MediaKind;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::CompressionConfig;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::new_temp_path;
use crate::raster::resize_to_jpeg;

/// Output of the compression stage, removed from disk when dropped.
#[derive(Debug)]
pub struct CompressedArtifact {
    pub path: TempPath,
    pub kind: MediaKind,
    pub size: u64,
}

impl CompressedArtifact {
    pub fn mime(&self) -> &'static str {
        self.kind.output_mime()
    }
}

/// Compresses uploads into normalized MP4 or JPEG artifacts.
#[derive(Debug, Clone)]
pub struct Compressor {
    config: CompressionConfig,
    runner: FfmpegRunner,
    work_dir: PathBuf,
}

impl Compressor {
    /// Artifacts are created inside `work_dir`.
    pub fn new(config: CompressionConfig, work_dir: impl Into<PathBuf>) -> Self {
        let runner = FfmpegRunner::new(&config.ffmpeg_path).with_timeout(config.ffmpeg_timeout);
        Self {
            config,
            runner,
            work_dir: work_dir.into(),
        }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Verify the configured FFmpeg binary is usable.
    pub fn check_ffmpeg(&self) -> MediaResult<PathBuf> {
        self.runner.check_binary()
    }

    /// Compress `input` according to `kind`. The input is left untouched.
    pub async fn compress(&self, kind: MediaKind, input: &Path) -> MediaResult<CompressedArtifact> {
        let started = Instant::now();
        let output = new_temp_path(&self.work_dir, kind.output_extension())?;

        match kind {
            MediaKind::Video => self.compress_video(input, &output).await?,
            MediaKind::Image => self.compress_image(input, &output).await?,
        }

        let size = tokio::fs::metadata(&output).await?.len();
        if size == 0 {
            return Err(MediaError::internal(format!(
                "{} compression produced an empty file",
                kind
            )));
        }

        info!(
            kind = %kind,
            size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Compressed upload"
        );

        Ok(CompressedArtifact {
            path: output,
            kind,
            size,
        })
    }

    async fn compress_video(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output)
            .output_args(self.config.video.to_ffmpeg_args())
            .format("mp4");

        let progress = self.runner.run(&cmd).await?;
        debug!(
            frames = progress.frame,
            out_time_ms = progress.out_time_ms,
            "FFmpeg finished"
        );
        Ok(())
    }

    async fn compress_image(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        let config = self.config.image;

        let (width, height) =
            tokio::task::spawn_blocking(move || resize_to_jpeg(&input, &output, &config))
                .await
                .map_err(|e| MediaError::internal(format!("image task failed: {}", e)))??;

        debug!(width, height, "Image resized");
        Ok(())
    }
}

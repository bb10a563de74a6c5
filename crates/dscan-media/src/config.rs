//! Compression configuration.

use std::path::PathBuf;
use std::time::Duration;

use dscan_models::encoding::{
    DEFAULT_IMAGE_MAX_HEIGHT, DEFAULT_IMAGE_TARGET_WIDTH, DEFAULT_JPEG_QUALITY,
    DEFAULT_VIDEO_TARGET_WIDTH,
};
use dscan_models::{ImageEncodingConfig, VideoEncodingConfig};

/// Default FFmpeg wall-clock limit.
pub const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 600;

/// Settings for the compression stage.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// FFmpeg executable used for video
    pub ffmpeg_path: PathBuf,
    pub ffmpeg_timeout: Duration,
    pub video: VideoEncodingConfig,
    pub image: ImageEncodingConfig,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffmpeg_timeout: Duration::from_secs(DEFAULT_FFMPEG_TIMEOUT_SECS),
            video: VideoEncodingConfig::default(),
            image: ImageEncodingConfig::default(),
        }
    }
}

impl CompressionConfig {
    /// Load from environment variables.
    ///
    /// `FFMPEG_PATH` wins; otherwise `ffmpeg` is resolved from `PATH` once here.
    pub fn from_env() -> Self {
        let ffmpeg_path = std::env::var("FFMPEG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| which::which("ffmpeg").ok())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));

        let video_width = env_parse("VIDEO_TARGET_WIDTH", DEFAULT_VIDEO_TARGET_WIDTH);
        let image_width = env_parse("IMAGE_TARGET_WIDTH", DEFAULT_IMAGE_TARGET_WIDTH).max(1);
        let image_max_height = env_parse("IMAGE_MAX_HEIGHT", DEFAULT_IMAGE_MAX_HEIGHT).max(1);
        let jpeg_quality = jpeg_quality_from(env_parse("JPEG_QUALITY", DEFAULT_JPEG_QUALITY as u32));

        Self {
            ffmpeg_path,
            ffmpeg_timeout: Duration::from_secs(env_parse(
                "FFMPEG_TIMEOUT_SECS",
                DEFAULT_FFMPEG_TIMEOUT_SECS,
            )),
            video: VideoEncodingConfig::default().with_target_width(video_width),
            image: ImageEncodingConfig {
                target_width: image_width,
                max_height: image_max_height,
                jpeg_quality,
            },
        }
    }
}

fn jpeg_quality_from(value: u32) -> u8 {
    // Clamped to 1..=100, the conversion cannot fail
    u8::try_from(value.clamp(1, 100)).unwrap_or(DEFAULT_JPEG_QUALITY)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg");
        std::env::set_var("FFMPEG_TIMEOUT_SECS", "42");
        std::env::set_var("IMAGE_TARGET_WIDTH", "1024");
        std::env::set_var("JPEG_QUALITY", "250");

        let config = CompressionConfig::from_env();
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(42));
        assert_eq!(config.image.target_width, 1024);
        assert_eq!(config.image.jpeg_quality, 100);
        assert_eq!(config.video.target_width, DEFAULT_VIDEO_TARGET_WIDTH);

        for key in ["FFMPEG_PATH", "FFMPEG_TIMEOUT_SECS", "IMAGE_TARGET_WIDTH", "JPEG_QUALITY"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        std::env::set_var("VIDEO_TARGET_WIDTH", "wide");

        let config = CompressionConfig::from_env();
        assert_eq!(config.video.target_width, DEFAULT_VIDEO_TARGET_WIDTH);
        assert_eq!(config.image.jpeg_quality, DEFAULT_JPEG_QUALITY);

        std::env::remove_var("VIDEO_TARGET_WIDTH");
    }

    #[test]
    #[serial]
    fn test_jpeg_quality_clamps_across_range() {
        for (raw, expected) in [("0", 1), ("60", 60), ("101", 100), ("300", 100), ("70000", 100)] {
            std::env::set_var("JPEG_QUALITY", raw);
            assert_eq!(CompressionConfig::from_env().image.jpeg_quality, expected, "{raw}");
        }
        std::env::remove_var("JPEG_QUALITY");
    }

    #[test]
    #[serial]
    fn test_image_max_height_override() {
        std::env::set_var("IMAGE_MAX_HEIGHT", "2000");
        assert_eq!(CompressionConfig::from_env().image.max_height, 2000);
        std::env::remove_var("IMAGE_MAX_HEIGHT");

        assert_eq!(
            CompressionConfig::from_env().image.max_height,
            DEFAULT_IMAGE_MAX_HEIGHT
        );
    }
}

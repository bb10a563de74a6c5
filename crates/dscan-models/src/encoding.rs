//! Encoding defaults for the compression stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// H.264 profile decodable by practically every player
pub const DEFAULT_VIDEO_PROFILE: &str = "main";
/// 4:2:0 chroma subsampling, required for broad decoder support
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Default video bitrate
pub const DEFAULT_VIDEO_BITRATE: &str = "1000k";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Speed-biased encoding preset
pub const DEFAULT_PRESET: &str = "veryfast";
/// Output width for normalized video
pub const DEFAULT_VIDEO_TARGET_WIDTH: u32 = 640;

/// Output width for normalized images
pub const DEFAULT_IMAGE_TARGET_WIDTH: u32 = 800;
/// Tallest image the resize may produce; very tall sources shrink to fit
pub const DEFAULT_IMAGE_MAX_HEIGHT: u32 = 4096;
/// JPEG quality factor (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Video re-encode settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoEncodingConfig {
    #[serde(default = "default_video_codec")]
    pub codec: String,

    #[serde(default = "default_video_profile")]
    pub profile: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Output width in pixels; height follows the source aspect ratio
    #[serde(default = "default_video_target_width")]
    pub target_width: u32,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_video_profile() -> String {
    DEFAULT_VIDEO_PROFILE.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_video_bitrate() -> String {
    DEFAULT_VIDEO_BITRATE.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_video_target_width() -> u32 {
    DEFAULT_VIDEO_TARGET_WIDTH
}

impl Default for VideoEncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            profile: DEFAULT_VIDEO_PROFILE.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            video_bitrate: DEFAULT_VIDEO_BITRATE.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            target_width: DEFAULT_VIDEO_TARGET_WIDTH,
        }
    }
}

impl VideoEncodingConfig {
    /// Returns a new config with a different target width.
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width;
        self
    }

    /// Scale filter: fixed width, height derived from the aspect ratio and
    /// rounded to an even value (`-2`) as 4:2:0 subsampling requires.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:-2", even(self.target_width))
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-vf".to_string(),
            self.scale_filter(),
            "-c:v".to_string(),
            self.codec.clone(),
            "-profile:v".to_string(),
            self.profile.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-b:v".to_string(),
            self.video_bitrate.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

/// Image resize/re-encode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageEncodingConfig {
    pub target_width: u32,
    /// Output height bound; width shrinks with it to keep the aspect ratio
    #[serde(default = "default_image_max_height")]
    pub max_height: u32,
    pub jpeg_quality: u8,
}

fn default_image_max_height() -> u32 {
    DEFAULT_IMAGE_MAX_HEIGHT
}

impl Default for ImageEncodingConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_IMAGE_TARGET_WIDTH,
            max_height: DEFAULT_IMAGE_MAX_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageEncodingConfig {
    /// Target dimensions for a source image, preserving its aspect ratio.
    ///
    /// The width is `target_width` unless the resulting height would exceed
    /// `max_height`; then the height is pinned and the width follows.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_height = self.max_height.max(1);
        if width == 0 || height == 0 {
            return (self.target_width.max(1), height.clamp(1, max_height));
        }

        let (width, height) = (width as u64, height as u64);
        let target_width = self.target_width.max(1) as u64;
        let scaled = (height * target_width + width / 2) / width;
        if scaled <= max_height as u64 {
            return (target_width as u32, (scaled as u32).max(1));
        }

        let fitted = (width * max_height as u64 + height / 2) / height;
        ((fitted.min(target_width) as u32).max(1), max_height)
    }
}

fn even(value: u32) -> u32 {
    (value.max(2) / 2) * 2
}

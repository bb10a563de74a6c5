//! Still-image resize and JPEG re-encode.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::io::{Limits, Reader as ImageReader};
use image::ColorType;

use dscan_models::ImageEncodingConfig;

use crate::error::MediaResult;

/// Largest source width or height accepted by the decoder.
pub const MAX_SOURCE_DIMENSION: u32 = 32_768;
/// Decoder allocation ceiling.
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_SOURCE_DIMENSION);
    limits.max_image_height = Some(MAX_SOURCE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Resize `input` to the configured width and write it to `output` as JPEG.
///
/// Blocking; callers on the runtime should go through `spawn_blocking`.
/// Returns the output dimensions.
pub fn resize_to_jpeg(
    input: &Path,
    output: &Path,
    config: &ImageEncodingConfig,
) -> MediaResult<(u32, u32)> {
    // Content sniffing, uploads often carry misleading extensions
    let mut reader = ImageReader::open(input)?.with_guessed_format()?;
    reader.limits(decode_limits());
    let source = reader.decode()?;

    let (width, height) = config.target_dimensions(source.width(), source.height());
    let resized = source.resize_exact(width, height, FilterType::Lanczos3);
    let rgb = resized.to_rgb8();

    let mut writer = BufWriter::new(File::create(output)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, config.jpeg_quality);
    encoder.encode(rgb.as_raw(), width, height, ColorType::Rgb8)?;

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};
    use tempfile::TempDir;

    #[test]
    fn test_resize_keeps_aspect_and_emits_jpeg() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("source.png");
        let output = dir.path().join("out.jpg");

        let img = ImageBuffer::from_pixel(200, 100, Rgba([10u8, 200, 30, 128]));
        img.save_with_format(&input, ImageFormat::Png).unwrap();

        let dims = resize_to_jpeg(&input, &output, &ImageEncodingConfig::default()).unwrap();
        assert_eq!(dims, (800, 400));

        let reader = ImageReader::open(&output)
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Jpeg));
        assert_eq!(reader.into_dimensions().unwrap(), (800, 400));
    }

    #[test]
    fn test_tall_narrow_image_is_bounded() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("strip.png");
        let output = dir.path().join("strip.jpg");

        let img = ImageBuffer::from_pixel(1, 20_000, Rgb([200u8, 10, 10]));
        img.save_with_format(&input, ImageFormat::Png).unwrap();

        let config = ImageEncodingConfig::default();
        let (width, height) = resize_to_jpeg(&input, &output, &config).unwrap();
        assert_eq!((width, height), (1, config.max_height));
        assert!(output.exists());
    }

    #[test]
    fn test_oversized_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("huge.png");

        let img = ImageBuffer::from_pixel(1, MAX_SOURCE_DIMENSION + 1, Rgb([0u8, 0, 0]));
        img.save_with_format(&input, ImageFormat::Png).unwrap();

        let result = resize_to_jpeg(&input, &dir.path().join("out.jpg"), &Default::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_input_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.png");
        std::fs::write(&input, b"definitely not an image").unwrap();

        let result = resize_to_jpeg(&input, &dir.path().join("out.jpg"), &Default::default());
        assert!(result.is_err());
    }
}

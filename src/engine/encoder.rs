// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), native formats (image)

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::MAX_DIMENSION;
use crate::error::BatchError;
use crate::ops::OutputFormat;
use image::{DynamicImage, ImageFormat};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;
use std::io::Cursor;

/// Highest PNG compression effort.
pub const MAX_PNG_COMPRESSION: u8 = 9;

/// Maps the job's single 1-100 quality value onto each encoder's own knobs.
///
/// - JPEG: quality is handed to mozjpeg unchanged
/// - PNG: `round((100 - q) / 10)`, clamped to 0-9, used as the deflate level
/// - Native formats: ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualitySettings {
    quality: u8,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.quality
    }

    pub fn png_compression_level(&self) -> u8 {
        png_compression_level(self.quality)
    }

    /// mozjpeg smoothing: more aggressive at low quality to hide block noise
    fn jpeg_smoothing(&self) -> u8 {
        match self.quality {
            90.. => 0,
            70..=89 => 5,
            60..=69 => 10,
            _ => 18,
        }
    }
}

/// PNG compression effort for a 1-100 quality: `round((100 - q) / 10)`, clamped to 0-9.
///
/// Higher quality means less compression effort (output stays lossless either way).
pub fn png_compression_level(quality: u8) -> u8 {
    let q = u32::from(quality.min(100));
    // integer round-half-up of (100 - q) / 10
    let level = (100 - q + 5) / 10;
    level.min(u32::from(MAX_PNG_COMPRESSION)) as u8
}

/// Pre-process a decoded image for the chosen output format.
///
/// JPEG has no alpha channel: the image is flattened to RGB8 here, before
/// resizing, so the resampler never sees alpha. PNG keeps whatever it has.
/// Native encoders get RGB8 or RGBA8, the layouts every one of them accepts.
pub fn prepare_for_format(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    match (format, img) {
        (OutputFormat::Jpeg, img @ DynamicImage::ImageRgb8(_)) => img,
        (OutputFormat::Jpeg, other) => DynamicImage::ImageRgb8(other.to_rgb8()),
        (OutputFormat::Png, img) => img,
        (OutputFormat::Native(_), img @ DynamicImage::ImageRgb8(_))
        | (OutputFormat::Native(_), img @ DynamicImage::ImageRgba8(_)) => img,
        (OutputFormat::Native(_), other) if other.color().has_alpha() => {
            DynamicImage::ImageRgba8(other.to_rgba8())
        }
        (OutputFormat::Native(_), other) => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Encode `img` as `format`, applying the quality policy for that format.
pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> EngineResult<Vec<u8>> {
    let settings = QualitySettings::new(quality);
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, settings.jpeg_quality()),
        OutputFormat::Png => encode_png(img, settings.png_compression_level()),
        OutputFormat::Native(native) => encode_native(img, native),
    }
}

/// Encode to JPEG using mozjpeg with web-optimized settings
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let settings = QualitySettings::new(quality);

        // Zero-copy: avoid conversion if already RGB8
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(BatchError::encode_failed(
                "jpeg",
                "image width or height is zero",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(BatchError::encode_failed(
                "jpeg",
                format!("dimension {} exceeds maximum {MAX_DIMENSION}", w.max(h)),
            ));
        }
        let expected_len = (w as usize) * (h as usize) * 3;
        if pixels.len() != expected_len {
            return Err(BatchError::corrupted_image());
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
        comp.set_smoothing_factor(settings.jpeg_smoothing());
        // must come last: the optimize setters reset the quantization tables
        comp.set_quality(f32::from(settings.jpeg_quality()));

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                BatchError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    BatchError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                BatchError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        Ok(output)
    })
}

/// Encode to PNG with the image crate, then recompress with oxipng at `level` (0-9).
///
/// Reductions that would change the channel layout are off, so an RGBA input
/// stays RGBA even when every pixel is opaque.
pub fn encode_png(img: &DynamicImage, level: u8) -> EngineResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let level = level.min(MAX_PNG_COMPRESSION);

        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| BatchError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        let mut options = oxipng::Options::from_preset(level.min(6));
        // libdeflate's lowest supported level is 1; effort 0 and 1 share it
        options.deflater = oxipng::Deflater::Libdeflater {
            compression: level.max(1),
        };
        // always take the recompressed stream so the level is what decides the output
        options.force = true;
        options.strip = oxipng::StripChunks::None;
        options.bit_depth_reduction = false;
        options.color_type_reduction = false;
        options.palette_reduction = false;
        options.grayscale_reduction = false;

        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            BatchError::encode_failed("png", format!("oxipng recompression failed: {e}"))
        })
    })
}

/// Encode with the image crate's default encoder for `format`. No quality knob.
pub fn encode_native(img: &DynamicImage, format: ImageFormat) -> EngineResult<Vec<u8>> {
    let name = format.extensions_str().first().copied().unwrap_or("native");
    run_with_panic_policy("encode:native", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .map_err(|e| BatchError::encode_failed(name, e.to_string()))?;
        Ok(buf)
    })
}

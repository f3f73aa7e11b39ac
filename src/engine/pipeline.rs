// src/engine/pipeline.rs
//
// Resize operations: stretch, letterbox-center, and the Lanczos3 resampler

use crate::engine::common::EngineResult;
use crate::error::BatchError;
use crate::ops::ResizeMode;
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{imageops, imageops::FilterType, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::debug;

const CANVAS_WHITE_RGB: Rgb<u8> = Rgb([255, 255, 255]);
const CANVAS_WHITE_RGBA: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug)]
pub struct ResizeError {
    pub source_dims: (u32, u32),
    pub target_dims: (u32, u32),
    pub reason: String,
}

impl ResizeError {
    pub fn new(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_dims,
            target_dims,
            reason: reason.into(),
        }
    }

    pub fn into_batch_error(self) -> BatchError {
        BatchError::resize_failed(self.source_dims, self.target_dims, self.reason)
    }
}

/// Calculate resize dimensions maintaining aspect ratio (fit = inside semantics).
///
/// The result touches the target box on at least one axis. Callers that must
/// never enlarge go through [`calc_letterbox_dimensions`].
pub fn calc_resize_dimensions(
    orig_w: u32,
    orig_h: u32,
    target_w: u32,
    target_h: u32,
) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 || target_h == 0 {
        return (target_w.max(1), target_h.max(1));
    }
    let orig_ratio = orig_w as f64 / orig_h as f64;
    let target_ratio = target_w as f64 / target_h as f64;

    if orig_ratio > target_ratio {
        // Source is wider → fit to width
        let ratio = target_w as f64 / orig_w as f64;
        (target_w, (orig_h as f64 * ratio).round() as u32)
    } else {
        // Source is taller → fit to height
        let ratio = target_h as f64 / orig_h as f64;
        ((orig_w as f64 * ratio).round() as u32, target_h)
    }
}

/// Content size for letterbox-center: shrink to fit, never enlarge.
///
/// Each side ends up in `1..=target`.
pub fn calc_letterbox_dimensions(
    orig_w: u32,
    orig_h: u32,
    target_w: u32,
    target_h: u32,
) -> (u32, u32) {
    if orig_w <= target_w && orig_h <= target_h {
        return (orig_w.max(1), orig_h.max(1));
    }
    let (w, h) = calc_resize_dimensions(orig_w, orig_h, target_w, target_h);
    (w.clamp(1, target_w.max(1)), h.clamp(1, target_h.max(1)))
}

/// Top-left paste position that centers `content` on `canvas` (floor division).
pub fn letterbox_offsets(canvas: (u32, u32), content: (u32, u32)) -> (u32, u32) {
    (
        canvas.0.saturating_sub(content.0) / 2,
        canvas.1.saturating_sub(content.1) / 2,
    )
}

fn validate_resize_dimensions(src: (u32, u32), width: u32, height: u32) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(BatchError::resize_failed(
            src,
            (width, height),
            "target dimensions must be positive",
        ));
    }
    Ok(())
}

/// Keep RGB8/RGBA8 as-is; widen every other layout to RGBA8 for the resampler.
fn normalize_for_resize(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other => {
            debug!(
                width = other.width(),
                height = other.height(),
                "normalizing to rgba8 before resize"
            );
            DynamicImage::ImageRgba8(other.to_rgba8())
        }
    }
}

/// Resample to exactly `width`x`height`, ignoring aspect ratio.
pub fn stretch(img: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
    let src = (img.width(), img.height());
    validate_resize_dimensions(src, width, height)?;
    if src == (width, height) {
        return Ok(img);
    }
    fast_resize_owned(normalize_for_resize(img), width, height)
        .map_err(ResizeError::into_batch_error)
}

/// Shrink to fit (never enlarge) and center on a white `width`x`height` canvas.
///
/// Sources without alpha land on an opaque RGB canvas. Sources with alpha land
/// on an opaque RGBA canvas and keep their own alpha values.
pub fn letterbox_center(img: DynamicImage, width: u32, height: u32) -> EngineResult<DynamicImage> {
    let src = (img.width(), img.height());
    validate_resize_dimensions(src, width, height)?;

    let content_dims = calc_letterbox_dimensions(src.0, src.1, width, height);
    let has_alpha = img.color().has_alpha();
    let content = if content_dims == src {
        img
    } else {
        fast_resize_owned(normalize_for_resize(img), content_dims.0, content_dims.1)
            .map_err(ResizeError::into_batch_error)?
    };

    let (x, y) = letterbox_offsets((width, height), content_dims);
    debug!(
        source_width = src.0,
        source_height = src.1,
        content_width = content_dims.0,
        content_height = content_dims.1,
        offset_x = x,
        offset_y = y,
        "letterboxing"
    );

    if has_alpha {
        let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_WHITE_RGBA);
        imageops::replace(&mut canvas, &content.to_rgba8(), i64::from(x), i64::from(y));
        Ok(DynamicImage::ImageRgba8(canvas))
    } else {
        let mut canvas = RgbImage::from_pixel(width, height, CANVAS_WHITE_RGB);
        imageops::replace(&mut canvas, &content.to_rgb8(), i64::from(x), i64::from(y));
        Ok(DynamicImage::ImageRgb8(canvas))
    }
}

/// Map a decoded raster onto the target box according to `mode`.
pub fn apply_resize(
    img: DynamicImage,
    mode: ResizeMode,
    width: u32,
    height: u32,
) -> EngineResult<DynamicImage> {
    match mode {
        ResizeMode::Stretch => stretch(img, width, height),
        ResizeMode::LetterboxCenter => letterbox_center(img, width, height),
    }
}

/// Fast resize with owned DynamicImage (zero-copy for RGB/RGBA)
/// Returns Ok(resized) on success, Err(resize_error) on failure
pub fn fast_resize_owned(
    img: DynamicImage,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, ResizeError> {
    let src_width = img.width();
    let src_height = img.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ResizeError::new(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    // Use into_raw() to take ownership of the buffer instead of copying
    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    fast_resize_internal(
        src_width,
        src_height,
        src_pixels,
        pixel_type,
        dst_width,
        dst_height,
        default_resize_options(),
    )
    .map_err(|reason| ResizeError::new((src_width, src_height), (dst_width, dst_height), reason))
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

fn fast_resize_internal(
    src_width: u32,
    src_height: u32,
    mut src_pixels: Vec<u8>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
    options: ResizeOptions,
) -> std::result::Result<DynamicImage, String> {
    let pixel_count = (src_width as usize)
        .checked_mul(src_height as usize)
        .ok_or_else(|| "image dimensions overflow during resize".to_string())?;
    let required_bytes = pixel_count
        .checked_mul(pixel_type.size())
        .ok_or_else(|| "image buffer size overflow during resize".to_string())?;

    if src_pixels.len() < required_bytes {
        return Err(format!(
            "fir source image invalid buffer size. expected {required_bytes} bytes, got {} bytes",
            src_pixels.len()
        ));
    }

    let primary_result = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        pixel_type,
    ) {
        Ok(src_image) => {
            resize_with_source_image(src_image, pixel_type, dst_width, dst_height, &options)
        }
        Err(ImageBufferError::InvalidBufferAlignment) => {
            let aligned_image = copy_pixels_to_aligned_image(
                src_width,
                src_height,
                pixel_type,
                &src_pixels,
                required_bytes,
            )?;
            resize_with_source_image(aligned_image, pixel_type, dst_width, dst_height, &options)
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    match primary_result {
        Ok(img) => Ok(img),
        Err(err) => {
            debug!(error = %err, "fast_image_resize failed; falling back to image crate");
            resize_with_image_crate_fallback(
                &src_pixels,
                src_width,
                src_height,
                pixel_type,
                dst_width,
                dst_height,
            )
            .map_err(|fallback_err| format!("{err}; image crate fallback failed: {fallback_err}"))
        }
    }
}

fn copy_pixels_to_aligned_image(
    width: u32,
    height: u32,
    pixel_type: PixelType,
    src_pixels: &[u8],
    required_bytes: usize,
) -> std::result::Result<fir::images::Image<'static>, String> {
    let mut aligned_image = fir::images::Image::new(width, height, pixel_type);
    let aligned_buffer = aligned_image.buffer_mut();
    if aligned_buffer.len() != required_bytes {
        return Err(format!(
            "fir alignment fallback buffer mismatch. expected {required_bytes} bytes, got {} bytes",
            aligned_buffer.len()
        ));
    }
    aligned_buffer.copy_from_slice(&src_pixels[..required_bytes]);
    Ok(aligned_image)
}

fn resize_with_image_crate_fallback(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let filter = FilterType::Lanczos3;
    match pixel_type {
        PixelType::U8x3 => {
            let rgb = RgbImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgb8(imageops::resize(
                &rgb, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x4 => {
            let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgba8(imageops::resize(
                &rgba, dst_width, dst_height, filter,
            )))
        }
        _ => Err("fallback resize supports only U8x3/U8x4 pixel types".to_string()),
    }
}

/// True when every alpha byte of an RGBA buffer is 255. RGB is always opaque.
fn is_fully_opaque(image: &fir::images::Image<'_>, pixel_type: PixelType) -> bool {
    if pixel_type != PixelType::U8x4 {
        return true;
    }
    image.buffer().iter().skip(3).step_by(4).all(|&alpha| alpha == 255)
}

fn resize_with_source_image(
    mut src_image: fir::images::Image<'_>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
    options: &ResizeOptions,
) -> std::result::Result<DynamicImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    // Premultiply keeps transparent pixels from bleeding color into neighbours.
    let needs_premultiply = !is_fully_opaque(&src_image, pixel_type);

    let mul_div = MulDiv::default();
    if needs_premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if needs_premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => {
            let rgb_image = RgbImage::from_raw(dst_width, dst_height, dst_pixels)
                .ok_or("failed to create rgb image from resized data")?;
            Ok(DynamicImage::ImageRgb8(rgb_image))
        }
        PixelType::U8x4 => {
            let rgba_image = RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
                .ok_or("failed to create rgba image from resized data")?;
            Ok(DynamicImage::ImageRgba8(rgba_image))
        }
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}

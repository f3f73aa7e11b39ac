// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), everything else through the image crate.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::BatchError;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use mozjpeg::Decompress;
use std::io::Cursor;

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(BatchError::decode_failed("mozjpeg: missing JPEG EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            BatchError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            BatchError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width();
        let height = decompress.height();
        if width > MAX_DIMENSION as usize || height > MAX_DIMENSION as usize {
            return Err(BatchError::image_too_large(
                width.max(height).min(u32::MAX as usize) as u32,
                MAX_DIMENSION,
            ));
        }
        let width_u32 = width as u32;
        let height_u32 = height as u32;
        check_dimensions(width_u32, height_u32)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            BatchError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width_u32, height_u32, flat_pixels)
            .ok_or_else(|| BatchError::decode_failed("mozjpeg: truncated scanline data"))?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode non-JPEG formats using the image crate under the panic policy.
pub fn decode_with_image_crate(data: &[u8]) -> EngineResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| BatchError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route JPEG to mozjpeg (CMYK and other exotic JPEGs fall back to the image crate)
/// - Everything else goes to the image crate
pub fn decode_image(bytes: &[u8]) -> EngineResult<(DynamicImage, Option<ImageFormat>)> {
    if bytes.is_empty() {
        return Err(BatchError::decode_failed("file is empty"));
    }
    let detected = detect_format(bytes);
    if detected.is_none() {
        return Err(BatchError::decode_failed("unrecognized image format"));
    }

    ensure_dimensions_safe(bytes)?;

    let img = match detected {
        Some(ImageFormat::Jpeg) => match decode_jpeg_mozjpeg(bytes) {
            Ok(img) => img,
            Err(err @ BatchError::ImageTooLarge { .. })
            | Err(err @ BatchError::PixelCountExceedsLimit { .. }) => return Err(err),
            Err(err) => {
                tracing::debug!(error = %err, "mozjpeg rejected input; retrying with image crate");
                decode_with_image_crate(bytes)?
            }
        },
        _ => decode_with_image_crate(bytes)?,
    };

    check_dimensions(img.width(), img.height())?;
    Ok((img, detected))
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> EngineResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BatchError::image_too_large(width.max(height), MAX_DIMENSION));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(BatchError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> EngineResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, Rgba, RgbaImage};

    fn encode_as(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |_, _| Rgb([0, 0, 0]));
        encode_as(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    #[test]
    fn test_ensure_dimensions_safe_allows_small_image() {
        let data = encode_png(64, 64);
        assert!(ensure_dimensions_safe(&data).is_ok());
    }

    #[test]
    fn test_ensure_dimensions_safe_rejects_large_image() {
        let data = encode_png(MAX_DIMENSION + 1, 1);
        let err = ensure_dimensions_safe(&data).unwrap_err();
        assert!(matches!(err, BatchError::ImageTooLarge { .. }));
    }

    #[test]
    fn test_check_dimensions_boundaries() {
        assert!(check_dimensions(1, 1).is_ok());
        assert!(check_dimensions(10_000, 10_000).is_ok());
        assert!(matches!(
            check_dimensions(10_001, 10_000).unwrap_err(),
            BatchError::PixelCountExceedsLimit { .. }
        ));
        assert!(matches!(
            check_dimensions(MAX_DIMENSION + 1, 1).unwrap_err(),
            BatchError::ImageTooLarge { .. }
        ));
    }

    #[test]
    fn test_detect_format_jpeg_and_png() {
        let png = encode_png(2, 2);
        let jpeg = encode_as(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))),
            ImageFormat::Jpeg,
        );
        assert_eq!(detect_format(&png), Some(ImageFormat::Png));
        assert_eq!(detect_format(&jpeg), Some(ImageFormat::Jpeg));
        assert_eq!(detect_format(b"plain text, not an image"), None);
    }

    #[test]
    fn test_decode_image_routes_jpeg_to_mozjpeg() {
        let jpeg = encode_as(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 8, 7]))),
            ImageFormat::Jpeg,
        );
        let (img, fmt) = decode_image(&jpeg).unwrap();
        assert_eq!(fmt, Some(ImageFormat::Jpeg));
        assert_eq!(img.dimensions(), (2, 2));
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_decode_image_keeps_png_alpha() {
        let png = encode_as(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 1, Rgba([1, 2, 3, 4]))),
            ImageFormat::Png,
        );
        let (img, fmt) = decode_image(&png).unwrap();
        assert_eq!(fmt, Some(ImageFormat::Png));
        assert!(img.color().has_alpha());
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_image_handles_bmp() {
        let bmp = encode_as(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 4, Rgb([200, 100, 50]))),
            ImageFormat::Bmp,
        );
        let (img, fmt) = decode_image(&bmp).unwrap();
        assert_eq!(fmt, Some(ImageFormat::Bmp));
        assert_eq!(img.dimensions(), (5, 4));
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(matches!(
            decode_image(b"").unwrap_err(),
            BatchError::DecodeFailed { .. }
        ));
        assert!(matches!(
            decode_image(b"definitely not an image").unwrap_err(),
            BatchError::DecodeFailed { .. }
        ));
    }

    #[test]
    fn test_decode_truncated_png_fails_cleanly() {
        let mut png = encode_png(16, 16);
        png.truncate(png.len() / 2);
        let err = decode_image(&png).unwrap_err();
        assert!(err.is_item_level());
    }
}

// tests/edge_cases.rs
//
// Edge case tests for pixbatch
// Tests boundary values, invalid inputs, and error handling

use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use pixbatch::engine::{
    apply_resize, calc_letterbox_dimensions, check_dimensions, decode_image, encode_jpeg,
    encode_png, png_compression_level,
};
use pixbatch::{BatchError, ResizeMode};
use std::io::Cursor;

// Helper function to create test images
fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode_with_image_crate(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

mod minimal_image_tests {
    use super::*;

    #[test]
    fn test_1x1_stretch() {
        let img = create_test_image(1, 1);
        let resized = apply_resize(img, ResizeMode::Stretch, 100, 100).unwrap();
        assert_eq!(resized.dimensions(), (100, 100));
    }

    #[test]
    fn test_1x1_letterbox_is_not_enlarged() {
        let img = create_test_image(1, 1);
        let out = apply_resize(img, ResizeMode::LetterboxCenter, 100, 100)
            .unwrap()
            .to_rgb8();
        assert_eq!(out.dimensions(), (100, 100));
        // the single source pixel sits at (49, 49); everything else is canvas
        assert_eq!(out.get_pixel(49, 49), &image::Rgb([0, 0, 128]));
        assert_eq!(out.get_pixel(50, 49), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn test_letterbox_into_1x1_target() {
        let img = create_test_image(300, 7);
        assert_eq!(calc_letterbox_dimensions(300, 7, 1, 1), (1, 1));
        let out = apply_resize(img, ResizeMode::LetterboxCenter, 1, 1).unwrap();
        assert_eq!(out.dimensions(), (1, 1));
    }

    #[test]
    fn test_1x1_encode_jpeg() {
        let img = create_test_image(1, 1);
        let encoded = encode_jpeg(&img, 80).unwrap();
        // JPEG magic bytes
        assert_eq!(&encoded[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_1x1_encode_png() {
        let img = create_test_image(1, 1);
        let encoded = encode_png(&img, png_compression_level(85)).unwrap();
        // PNG magic bytes
        assert_eq!(
            &encoded[0..8],
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }
}

mod large_image_tests {
    use super::*;

    #[test]
    fn test_max_dimension_boundary() {
        // 32768x32768 passes the per-side check but not the pixel budget
        let err = check_dimensions(32768, 32768).unwrap_err();
        assert!(matches!(err, BatchError::PixelCountExceedsLimit { .. }));
    }

    #[test]
    fn test_exceed_max_dimension() {
        for (w, h) in [(32769, 1), (1, 32769)] {
            let err = check_dimensions(w, h).unwrap_err();
            assert!(err.to_string().contains("exceeds maximum"));
        }
    }

    #[test]
    fn test_max_pixels_boundary() {
        assert!(check_dimensions(10000, 10000).is_ok());
        assert!(check_dimensions(10001, 10000).is_err());
    }

    #[test]
    fn test_extreme_aspect_ratios_are_allowed() {
        assert!(check_dimensions(32768, 1).is_ok());
        assert!(check_dimensions(1, 32768).is_ok());
    }

    #[test]
    fn test_letterbox_extreme_aspect_ratio_keeps_one_pixel() {
        // 32768:1 into 100x100 rounds the short side to 0; it is clamped to 1
        assert_eq!(calc_letterbox_dimensions(32768, 1, 100, 100), (100, 1));
        assert_eq!(calc_letterbox_dimensions(1, 32768, 100, 100), (1, 100));
    }

    #[test]
    fn test_letterbox_thin_strip_renders() {
        let img = create_test_image(2000, 3);
        let out = apply_resize(img, ResizeMode::LetterboxCenter, 50, 50)
            .unwrap()
            .to_rgb8();
        assert_eq!(out.dimensions(), (50, 50));
        assert_eq!(out.get_pixel(25, 0), &image::Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(25, 49), &image::Rgb([255, 255, 255]));
    }
}

mod corrupted_image_tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let err = decode_image(&[]).unwrap_err();
        assert!(matches!(err, BatchError::DecodeFailed { .. }));
    }

    #[test]
    fn test_jpeg_header_only() {
        // JPEG magic bytes (0xFF 0xD8) only
        let result = decode_image(&[0xFF, 0xD8]);
        assert!(result.is_err());
        assert!(result.unwrap_err().is_item_level());
    }

    #[test]
    fn test_png_signature_only() {
        let result = decode_image(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(result.is_err());
    }

    #[test]
    fn test_random_bytes() {
        let garbage: Vec<u8> = (0..512u32).map(|i| (i * 31 % 251) as u8).collect();
        assert!(decode_image(&garbage).is_err());
    }

    #[test]
    fn test_truncated_png_body() {
        let png = encode_with_image_crate(&create_test_image(64, 64), ImageFormat::Png);
        let truncated = &png[..png.len() / 2];
        let err = decode_image(truncated).unwrap_err();
        assert!(err.is_item_level());
    }

    #[test]
    fn test_valid_jpeg_decodes() {
        let jpeg = encode_with_image_crate(&create_test_image(33, 17), ImageFormat::Jpeg);
        let (img, format) = decode_image(&jpeg).unwrap();
        assert_eq!(format, Some(ImageFormat::Jpeg));
        assert_eq!(img.dimensions(), (33, 17));
    }
}

mod quality_boundary_tests {
    use super::*;

    #[test]
    fn test_png_level_mapping_points() {
        assert_eq!(png_compression_level(100), 0);
        assert_eq!(png_compression_level(90), 1);
        assert_eq!(png_compression_level(50), 5);
        assert_eq!(png_compression_level(10), 9);
        // (100 - 1) / 10 rounds to 10, clamped to 9
        assert_eq!(png_compression_level(1), 9);
    }

    #[test]
    fn test_jpeg_quality_extremes() {
        let img = create_test_image(64, 64);
        let low = encode_jpeg(&img, 1).unwrap();
        let high = encode_jpeg(&img, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_png_level_extremes_decode_identically() {
        let img = create_test_image(40, 30);
        let fast = encode_png(&img, 0).unwrap();
        let small = encode_png(&img, 9).unwrap();
        let a = image::load_from_memory(&fast).unwrap().to_rgb8();
        let b = image::load_from_memory(&small).unwrap().to_rgb8();
        assert_eq!(a.into_raw(), b.into_raw());
    }

    #[test]
    fn test_encode_zero_sized_image_fails() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let err = encode_jpeg(&img, 80).unwrap_err();
        assert!(matches!(err, BatchError::EncodeFailed { .. }));
    }
}

mod configuration_edge_tests {
    use pixbatch::{JobConfiguration, OutputFormat};

    #[test]
    fn test_format_names_are_case_insensitive() {
        for name in ["JPG", "jpeg", ".jpg", " Jpeg "] {
            let job = JobConfiguration::builder(["a.png"], "out")
                .format_str(name)
                .build()
                .unwrap();
            assert_eq!(job.format(), OutputFormat::Jpeg, "{name}");
        }
        let job = JobConfiguration::builder(["a.png"], "out")
            .format_str("TIF")
            .build()
            .unwrap();
        assert_eq!(job.format().extension(), "tiff");
    }

    #[test]
    fn test_errors_are_configuration_errors() {
        let err = JobConfiguration::builder(["a.png"], "out")
            .dimensions(0, 600)
            .build()
            .unwrap_err();
        assert!(!err.is_item_level());
        assert_eq!(err.category().code(), "PIXBATCH_CONFIG_ERROR");
    }
}

mod source_path_tests {
    use pixbatch::{BatchProcessor, ErrorCategory, JobConfiguration, JobEvent};

    #[test]
    fn test_directory_as_source_is_an_item_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("folder.png");
        std::fs::create_dir(&sub).unwrap();
        let config = JobConfiguration::builder([&sub], dir.path().join("out"))
            .build()
            .unwrap();

        let mut events = Vec::new();
        let summary = BatchProcessor::new(config)
            .run_blocking(&mut |e: JobEvent| events.push(e))
            .unwrap();
        assert_eq!(summary.failed, 1);
        let cause = events
            .iter()
            .find_map(|e| match e {
                JobEvent::Log(r) => r.outcome.as_ref().and_then(|o| o.cause().cloned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cause.category(), ErrorCategory::Decode);
    }

    #[test]
    fn test_uppercase_extension_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("SHOUT.PNG");
        super::create_test_image(6, 6)
            .save_with_format(&src, image::ImageFormat::Png)
            .unwrap();
        let out = dir.path().join("out");
        let config = JobConfiguration::builder([&src], &out).build().unwrap();

        let summary = BatchProcessor::new(config)
            .run_blocking(&mut |_: JobEvent| {})
            .unwrap();
        assert!(summary.all_succeeded());
        assert!(out.join("SHOUT.jpg").exists());
    }

    #[test]
    fn test_misleading_extension_is_decoded_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("actually_png.jpg");
        super::create_test_image(9, 9)
            .save_with_format(&src, image::ImageFormat::Png)
            .unwrap();
        let out = dir.path().join("out");
        let config = JobConfiguration::builder([&src], &out)
            .format_str("png")
            .build()
            .unwrap();

        let summary = BatchProcessor::new(config)
            .run_blocking(&mut |_: JobEvent| {})
            .unwrap();
        assert!(summary.all_succeeded());
        assert!(out.join("actually_png.png").exists());
    }
}

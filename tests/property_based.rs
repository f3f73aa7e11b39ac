use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use pixbatch::engine::{
    apply_resize, calc_letterbox_dimensions, letterbox_offsets, png_compression_level,
    progress_percent,
};
use pixbatch::ResizeMode;
use proptest::prelude::*;

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 200) as u8, (y % 200) as u8, 64])
    }))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_stretch_always_hits_target(
        orig_w in 1u32..=48,
        orig_h in 1u32..=48,
        target_w in 1u32..=48,
        target_h in 1u32..=48,
    ) {
        let img = create_test_image(orig_w, orig_h);
        let resized = apply_resize(img, ResizeMode::Stretch, target_w, target_h).unwrap();
        prop_assert_eq!(resized.dimensions(), (target_w, target_h));
    }

    #[test]
    fn prop_letterbox_output_is_canvas_sized(
        orig_w in 1u32..=48,
        orig_h in 1u32..=48,
        target_w in 1u32..=48,
        target_h in 1u32..=48,
    ) {
        let img = create_test_image(orig_w, orig_h);
        let resized = apply_resize(img, ResizeMode::LetterboxCenter, target_w, target_h).unwrap();
        prop_assert_eq!(resized.dimensions(), (target_w, target_h));
    }

    #[test]
    fn prop_letterbox_content_fits_and_never_enlarges(
        orig_w in 1u32..=4096,
        orig_h in 1u32..=4096,
        target_w in 1u32..=1024,
        target_h in 1u32..=1024,
    ) {
        let (w, h) = calc_letterbox_dimensions(orig_w, orig_h, target_w, target_h);
        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(w <= target_w && h <= target_h);
        prop_assert!(w <= orig_w && h <= orig_h);
        if orig_w <= target_w && orig_h <= target_h {
            prop_assert_eq!((w, h), (orig_w, orig_h));
        } else {
            // at least one side touches the box
            prop_assert!(w == target_w || h == target_h);
        }
    }

    #[test]
    fn prop_letterbox_scaled_content_keeps_aspect_ratio(
        orig_w in 1u32..=4096,
        orig_h in 1u32..=4096,
        target_w in 1u32..=1024,
        target_h in 1u32..=1024,
    ) {
        prop_assume!(orig_w > target_w || orig_h > target_h);
        let (w, h) = calc_letterbox_dimensions(orig_w, orig_h, target_w, target_h);
        // w/h == orig_w/orig_h up to rounding of the scaled side (plus the 1px floor)
        let cross = (u64::from(w) * u64::from(orig_h)).abs_diff(u64::from(h) * u64::from(orig_w));
        prop_assert!(cross <= u64::from(orig_w.max(orig_h)), "{}x{} -> {}x{}", orig_w, orig_h, w, h);
    }

    #[test]
    fn prop_letterbox_offsets_center_content(
        canvas_w in 1u32..=512,
        canvas_h in 1u32..=512,
        content_w in 1u32..=512,
        content_h in 1u32..=512,
    ) {
        let content = (content_w.min(canvas_w), content_h.min(canvas_h));
        let (x, y) = letterbox_offsets((canvas_w, canvas_h), content);
        prop_assert!(x + content.0 <= canvas_w);
        prop_assert!(y + content.1 <= canvas_h);
        // left margin is the floor half; right margin takes the odd pixel
        let right = canvas_w - content.0 - x;
        let bottom = canvas_h - content.1 - y;
        prop_assert!(right == x || right == x + 1);
        prop_assert!(bottom == y || bottom == y + 1);
    }

    #[test]
    fn prop_letterbox_margin_is_white(
        orig_w in 1u32..=40,
        orig_h in 1u32..=40,
        target_w in 1u32..=40,
        target_h in 1u32..=40,
    ) {
        let (cw, ch) = calc_letterbox_dimensions(orig_w, orig_h, target_w, target_h);
        let (x, y) = letterbox_offsets((target_w, target_h), (cw, ch));
        prop_assume!(x > 0 || y > 0);

        let img = create_test_image(orig_w, orig_h);
        let out = apply_resize(img, ResizeMode::LetterboxCenter, target_w, target_h)
            .unwrap()
            .to_rgb8();
        prop_assert_eq!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn prop_png_level_is_bounded_and_non_increasing(q in 1u8..=99) {
        let level = png_compression_level(q);
        prop_assert!(level <= 9);
        prop_assert!(png_compression_level(q + 1) <= level);
    }

    #[test]
    fn prop_progress_is_monotonic_and_below_100(total in 1usize..=10_000, index in 0usize..10_000) {
        prop_assume!(index + 1 < total);
        let here = progress_percent(index, total);
        let next = progress_percent(index + 1, total);
        prop_assert!(here <= next);
        prop_assert!(next < 100);
    }
}

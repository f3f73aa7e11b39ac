#![no_main]

//! Fuzz target for image encoding.
//! Tests JPEG (mozjpeg), PNG (oxipng) and native encoding paths for crashes.

use arbitrary::{Arbitrary, Unstructured};
use image::{DynamicImage, ImageFormat, RgbaImage};
use libfuzzer_sys::fuzz_target;
use pixbatch::engine::{encode, prepare_for_format};
use pixbatch::OutputFormat;

#[derive(Arbitrary, Debug)]
struct EncodeSeed {
    format: u8,
    quality: u8,
    width: u8,
    height: u8,
}

fn build_image(data: &[u8], width: u8, height: u8) -> DynamicImage {
    // Limit dimensions to avoid OOM (max 128x128 = 64KB RGBA)
    let w = (width as u32 % 128).max(1);
    let h = (height as u32 % 128).max(1);
    let pixel_count = (w * h * 4) as usize;

    let mut buffer = vec![0u8; pixel_count];
    for (i, byte) in buffer.iter_mut().enumerate() {
        *byte = data.get(i % data.len().max(1)).copied().unwrap_or(128);
    }

    let rgba = RgbaImage::from_raw(w, h, buffer)
        .unwrap_or_else(|| RgbaImage::from_raw(1, 1, vec![0, 0, 0, 255]).unwrap());
    DynamicImage::ImageRgba8(rgba)
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let mut unstructured = Unstructured::new(data);
    let seed: EncodeSeed = match EncodeSeed::arbitrary(&mut unstructured) {
        Ok(s) => s,
        Err(_) => return,
    };

    let img = build_image(data, seed.width, seed.height);
    let quality = seed.quality.clamp(1, 100);
    let format = match seed.format % 4 {
        0 => OutputFormat::Jpeg,
        1 => OutputFormat::Png,
        2 => OutputFormat::Native(ImageFormat::Bmp),
        _ => OutputFormat::Native(ImageFormat::Tiff),
    };

    // a valid in-memory image always encodes
    let img = prepare_for_format(img, format);
    let encoded = encode(&img, format, quality).unwrap();
    assert!(!encoded.is_empty());
});

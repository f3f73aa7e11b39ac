#![no_main]

//! Fuzz target for the decode -> resize path of a single item.
//! Arbitrary bytes are decoded (mozjpeg / image crate) and, when that
//! succeeds, stretched or letterboxed into a small box.

use libfuzzer_sys::fuzz_target;
use pixbatch::engine::{apply_resize, decode_image};
use pixbatch::ResizeMode;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // first two bytes pick the target box and mode, the rest is the file;
    // width uses the low six bits of data[0], the mode its top bit
    let width = u32::from(data[0] % 64) + 1;
    let height = u32::from(data[1] % 64) + 1;
    let mode = if data[0] & 0x80 == 0 {
        ResizeMode::Stretch
    } else {
        ResizeMode::LetterboxCenter
    };

    let Ok((img, _)) = decode_image(&data[2..]) else {
        return;
    };
    // keep each iteration cheap
    if u64::from(img.width()) * u64::from(img.height()) > 4096 * 4096 {
        return;
    }
    if let Ok(out) = apply_resize(img, mode, width, height) {
        assert_eq!((out.width(), out.height()), (width, height));
    }
});

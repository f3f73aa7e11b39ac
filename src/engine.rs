// src/engine.rs
//
// The batch engine. Runs a job on a background thread:
// 1. Decode each source (mozjpeg for JPEG, image crate for the rest)
// 2. Stretch or letterbox it to the target box
// 3. Encode with the format's quality policy and write atomically
// 4. Report progress / per-item log / completion through an event sink
//
// This file is a facade over the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height), for sources and targets.
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height) of a decoded source.
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod common;
mod decoder;
mod encoder;
mod events;
mod io;
mod pipeline;
pub(crate) mod pool;
mod tasks;

pub use api::{BatchProcessor, JobHandle};
pub use decoder::{check_dimensions, decode_image, detect_format, ensure_dimensions_safe};
pub use encoder::{
    encode, encode_jpeg, encode_native, encode_png, png_compression_level, prepare_for_format,
    QualitySettings,
};
pub use events::{progress_percent, ChannelSink, EventSink, JobEvent, JobSummary, LogRecord};
pub use io::{output_file_name, write_atomic, OutputNamer, Source};
pub use pipeline::{
    apply_resize, calc_letterbox_dimensions, calc_resize_dimensions, fast_resize_owned,
    letterbox_center, letterbox_offsets, stretch, ResizeError,
};
pub use pool::{effective_concurrency, MAX_CONCURRENCY};
pub use tasks::{ImageTask, OutcomeStatus, ProcessingOutcome};

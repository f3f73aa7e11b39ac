// lib.rs
//
// pixbatch: batch image resizing engine
//
// A job takes a list of source images and writes each one, resized to a
// fixed box, into an output directory:
// - Stretch or letterbox-center (white canvas) resizing
// - JPEG, PNG, or a pass-through format (BMP, GIF, TIFF, WebP)
// - One bad file never stops the batch
// - Progress, per-item log lines and a final summary as an event stream

pub mod engine;
pub mod error;
pub mod job;
pub mod ops;

pub use engine::{
    BatchProcessor, ChannelSink, EventSink, JobEvent, JobHandle, JobSummary, LogRecord,
    OutcomeStatus, ProcessingOutcome,
};
pub use error::{BatchError, ErrorCategory, Result};
pub use job::{JobConfiguration, JobConfigurationBuilder};
pub use ops::{CollisionPolicy, OutputFormat, ResizeMode};

// src/error.rs
//
// Unified error handling for pixbatch
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - Configuration: invalid job, reported before anything runs
// - Decode: a source could not be read or decoded (per item)
// - Encode: a result could not be resized, encoded or written (per item)
// - Internal: contained panics and thread failures

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy.
///
/// Only `Configuration` errors ever escape a run. Everything else is folded
/// into the failing item's outcome and the batch moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Invalid job configuration, fatal to the `run` call
    Configuration,
    /// Source missing, unreadable or not a decodable image
    Decode,
    /// Resize, encode or output write failure
    Encode,
    /// Library bugs (should not happen)
    Internal,
}

impl ErrorCategory {
    /// Get string representation of error category
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "ConfigurationError",
            ErrorCategory::Decode => "ItemDecodeError",
            ErrorCategory::Encode => "ItemEncodeError",
            ErrorCategory::Internal => "InternalError",
        }
    }

    /// Get the PIXBATCH_* error code string for this category
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "PIXBATCH_CONFIG_ERROR",
            ErrorCategory::Decode => "PIXBATCH_DECODE_ERROR",
            ErrorCategory::Encode => "PIXBATCH_ENCODE_ERROR",
            ErrorCategory::Internal => "PIXBATCH_INTERNAL_ERROR",
        }
    }
}

/// pixbatch error types
#[derive(Debug, Error)]
pub enum BatchError {
    // Configuration Errors
    #[error("Source list is empty")]
    EmptySourceList,

    #[error("Invalid target dimensions: width={width}, height={height}. Both must be positive")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Target dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Invalid quality {quality}. Expected a value in 1..=100")]
    InvalidQuality { quality: u32 },

    #[error("Unsupported output format: {format}")]
    UnsupportedFormat { format: Cow<'static, str> },

    #[error("Invalid resize mode: '{value}'. Expected stretch or letterbox-center")]
    InvalidResizeMode { value: Cow<'static, str> },

    #[error("Invalid collision policy: '{value}'. Expected overwrite, reject or suffix")]
    InvalidCollisionPolicy { value: Cow<'static, str> },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Output directory '{path}' is unavailable: {source}")]
    OutputDirUnavailable {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Decode Errors
    #[error("File not found: {path}")]
    FileNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to memory-map file '{path}': {source}")]
    MmapFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Corrupted image data")]
    CorruptedImage,

    #[error("Image dimension {dimension} exceeds maximum {max}")]
    ImageTooLarge { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Encode Errors
    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Output '{path}' was already written by an earlier item in this job")]
    OutputCollision { path: Cow<'static, str> },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

fn clone_io(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}

impl Clone for BatchError {
    fn clone(&self) -> Self {
        match self {
            Self::EmptySourceList => Self::EmptySourceList,
            Self::InvalidDimensions { width, height } => Self::InvalidDimensions {
                width: *width,
                height: *height,
            },
            Self::DimensionExceedsLimit { dimension, max } => Self::DimensionExceedsLimit {
                dimension: *dimension,
                max: *max,
            },
            Self::InvalidQuality { quality } => Self::InvalidQuality { quality: *quality },
            Self::UnsupportedFormat { format } => Self::UnsupportedFormat {
                format: format.clone(),
            },
            Self::InvalidResizeMode { value } => Self::InvalidResizeMode {
                value: value.clone(),
            },
            Self::InvalidCollisionPolicy { value } => Self::InvalidCollisionPolicy {
                value: value.clone(),
            },
            Self::InvalidArgument {
                name,
                value,
                reason,
            } => Self::InvalidArgument {
                name: name.clone(),
                value: value.clone(),
                reason: reason.clone(),
            },
            Self::OutputDirUnavailable { path, source } => Self::OutputDirUnavailable {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::FileNotFound { path } => Self::FileNotFound { path: path.clone() },
            Self::FileReadFailed { path, source } => Self::FileReadFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::MmapFailed { path, source } => Self::MmapFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::DecodeFailed { message } => Self::DecodeFailed {
                message: message.clone(),
            },
            Self::CorruptedImage => Self::CorruptedImage,
            Self::ImageTooLarge { dimension, max } => Self::ImageTooLarge {
                dimension: *dimension,
                max: *max,
            },
            Self::PixelCountExceedsLimit { pixels, max } => Self::PixelCountExceedsLimit {
                pixels: *pixels,
                max: *max,
            },
            Self::ResizeFailed {
                source_width,
                source_height,
                target_width,
                target_height,
                message,
            } => Self::ResizeFailed {
                source_width: *source_width,
                source_height: *source_height,
                target_width: *target_width,
                target_height: *target_height,
                message: message.clone(),
            },
            Self::EncodeFailed { format, message } => Self::EncodeFailed {
                format: format.clone(),
                message: message.clone(),
            },
            Self::FileWriteFailed { path, source } => Self::FileWriteFailed {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::OutputCollision { path } => Self::OutputCollision { path: path.clone() },
            Self::InternalPanic { message } => Self::InternalPanic {
                message: message.clone(),
            },
        }
    }
}

// Constructor Helpers
impl BatchError {
    pub fn empty_source_list() -> Self {
        Self::EmptySourceList
    }

    pub fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn invalid_quality(quality: u32) -> Self {
        Self::InvalidQuality { quality }
    }

    pub fn unsupported_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn invalid_resize_mode(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidResizeMode {
            value: value.into(),
        }
    }

    pub fn invalid_collision_policy(value: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidCollisionPolicy {
            value: value.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn output_dir_unavailable(
        path: impl Into<Cow<'static, str>>,
        source: std::io::Error,
    ) -> Self {
        Self::OutputDirUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn mmap_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::MmapFailed {
            path: path.into(),
            source,
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn corrupted_image() -> Self {
        Self::CorruptedImage
    }

    pub fn image_too_large(dimension: u32, max: u32) -> Self {
        Self::ImageTooLarge { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn output_collision(path: impl Into<Cow<'static, str>>) -> Self {
        Self::OutputCollision { path: path.into() }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// True when the error belongs to a single item and must not abort the batch.
    pub fn is_item_level(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Configuration)
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptySourceList
            | Self::InvalidDimensions { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::InvalidQuality { .. }
            | Self::UnsupportedFormat { .. }
            | Self::InvalidResizeMode { .. }
            | Self::InvalidCollisionPolicy { .. }
            | Self::InvalidArgument { .. }
            | Self::OutputDirUnavailable { .. } => ErrorCategory::Configuration,

            Self::FileNotFound { .. }
            | Self::FileReadFailed { .. }
            | Self::MmapFailed { .. }
            | Self::DecodeFailed { .. }
            | Self::CorruptedImage
            | Self::ImageTooLarge { .. }
            | Self::PixelCountExceedsLimit { .. } => ErrorCategory::Decode,

            // Resizing happens after a successful decode, so a failure there is
            // reported alongside encode/write problems.
            Self::ResizeFailed { .. }
            | Self::EncodeFailed { .. }
            | Self::FileWriteFailed { .. }
            | Self::OutputCollision { .. } => ErrorCategory::Encode,

            Self::InternalPanic { .. } => ErrorCategory::Internal,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, BatchError>;

// src/ops.rs
//
// Job-level choices: output format, resize mode, collision policy.
// These are cheap values copied into every task - the work happens in engine/.

use crate::error::BatchError;
use image::ImageFormat;
use std::fmt;
use std::str::FromStr;

/// Output format for encoding.
///
/// `Jpeg` and `Png` have dedicated encoders with a quality mapping.
/// `Native` passes through to the image crate's default encoder for that
/// format and ignores quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Native(ImageFormat),
}

impl OutputFormat {
    /// File extension written for this format (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Native(ImageFormat::Bmp) => "bmp",
            OutputFormat::Native(ImageFormat::Gif) => "gif",
            OutputFormat::Native(ImageFormat::Tiff) => "tiff",
            OutputFormat::Native(ImageFormat::WebP) => "webp",
            OutputFormat::Native(other) => {
                other.extensions_str().first().copied().unwrap_or("img")
            }
        }
    }

    /// Short lowercase name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Native(_) => self.extension(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = BatchError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.trim().trim_start_matches('.').to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Native(ImageFormat::Bmp)),
            "gif" => Ok(Self::Native(ImageFormat::Gif)),
            "tif" | "tiff" => Ok(Self::Native(ImageFormat::Tiff)),
            "webp" => Ok(Self::Native(ImageFormat::WebP)),
            _ => Err(BatchError::unsupported_format(format.to_string())),
        }
    }
}

/// How the decoded raster is mapped onto the target box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResizeMode {
    /// Resample to exactly the target size, ignoring aspect ratio
    #[default]
    Stretch,
    /// Shrink to fit (never enlarge), then center on a white canvas of the target size
    LetterboxCenter,
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResizeMode::Stretch => "stretch",
            ResizeMode::LetterboxCenter => "letterbox-center",
        })
    }
}

impl FromStr for ResizeMode {
    type Err = BatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "stretch" | "fill" => Ok(Self::Stretch),
            "letterbox-center" | "letterbox" | "fit" => Ok(Self::LetterboxCenter),
            _ => Err(BatchError::invalid_resize_mode(value.to_string())),
        }
    }
}

/// What happens when two sources in one job map to the same output name.
///
/// Only names claimed during the current run count. Files left in the output
/// directory by earlier runs are always overwritten.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Later items replace earlier outputs
    #[default]
    Overwrite,
    /// Later items fail with an `OutputCollision` error
    Reject,
    /// Later items get `-1`, `-2`, ... appended to the stem
    Suffix,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollisionPolicy::Overwrite => "overwrite",
            CollisionPolicy::Reject => "reject",
            CollisionPolicy::Suffix => "suffix",
        })
    }
}

impl FromStr for CollisionPolicy {
    type Err = BatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" | "error" => Ok(Self::Reject),
            "suffix" | "rename" => Ok(Self::Suffix),
            _ => Err(BatchError::invalid_collision_policy(value.to_string())),
        }
    }
}

// src/job.rs
//
// Job configuration: the immutable description of one batch run.
// Validation happens once, in build(). The engine never mutates a job.

use crate::engine::pool::MAX_CONCURRENCY;
use crate::engine::MAX_DIMENSION;
use crate::error::{BatchError, Result};
use crate::ops::{CollisionPolicy, OutputFormat, ResizeMode};
use std::path::{Path, PathBuf};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_QUALITY: u8 = 85;

/// A validated batch job.
#[derive(Clone, Debug)]
pub struct JobConfiguration {
    sources: Vec<PathBuf>,
    output_dir: PathBuf,
    width: u32,
    height: u32,
    format: OutputFormat,
    quality: u8,
    resize_mode: ResizeMode,
    collision_policy: CollisionPolicy,
    concurrency: usize,
}

impl JobConfiguration {
    /// Start a job over `sources`, writing into `output_dir`.
    ///
    /// Defaults: 800x600, JPEG, quality 85, stretch, overwrite, sequential.
    pub fn builder<I, P>(sources: I, output_dir: impl Into<PathBuf>) -> JobConfigurationBuilder
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        JobConfigurationBuilder {
            sources: sources.into_iter().map(Into::into).collect(),
            output_dir: output_dir.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: u32::from(DEFAULT_QUALITY),
            format: Ok(OutputFormat::default()),
            resize_mode: Ok(ResizeMode::default()),
            collision_policy: Ok(CollisionPolicy::default()),
            concurrency: 1,
        }
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Quality in 1..=100; interpretation depends on the format
    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn resize_mode(&self) -> ResizeMode {
        self.resize_mode
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collision_policy
    }

    /// Requested worker count: 1 sequential, 0 auto-detect, >1 bounded pool
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Builder for [`JobConfiguration`].
///
/// String setters defer their parse errors to `build()` so that every
/// configuration problem surfaces from one place.
#[derive(Debug)]
pub struct JobConfigurationBuilder {
    sources: Vec<PathBuf>,
    output_dir: PathBuf,
    width: u32,
    height: u32,
    quality: u32,
    format: Result<OutputFormat>,
    resize_mode: Result<ResizeMode>,
    collision_policy: Result<CollisionPolicy>,
    concurrency: usize,
}

impl JobConfigurationBuilder {
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Ok(format);
        self
    }

    /// Parse the format from a name such as `"jpg"`, `"png"` or `"tiff"`
    pub fn format_str(mut self, format: &str) -> Self {
        self.format = format.parse();
        self
    }

    pub fn quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    pub fn resize_mode(mut self, mode: ResizeMode) -> Self {
        self.resize_mode = Ok(mode);
        self
    }

    pub fn resize_mode_str(mut self, mode: &str) -> Self {
        self.resize_mode = mode.parse();
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = Ok(policy);
        self
    }

    pub fn collision_policy_str(mut self, policy: &str) -> Self {
        self.collision_policy = policy.parse();
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Validate and freeze the configuration. No filesystem access happens here.
    pub fn build(self) -> Result<JobConfiguration> {
        if self.sources.is_empty() {
            return Err(BatchError::empty_source_list());
        }
        if self.width == 0 || self.height == 0 {
            return Err(BatchError::invalid_dimensions(self.width, self.height));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(BatchError::dimension_exceeds_limit(
                self.width.max(self.height),
                MAX_DIMENSION,
            ));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(BatchError::invalid_quality(self.quality));
        }
        if self.concurrency > MAX_CONCURRENCY {
            return Err(BatchError::invalid_argument(
                "concurrency",
                self.concurrency.to_string(),
                format!("must be 0 (auto) or 1-{MAX_CONCURRENCY}"),
            ));
        }

        Ok(JobConfiguration {
            sources: self.sources,
            output_dir: self.output_dir,
            width: self.width,
            height: self.height,
            format: self.format?,
            // range checked above
            quality: self.quality as u8,
            resize_mode: self.resize_mode?,
            collision_policy: self.collision_policy?,
            concurrency: self.concurrency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> JobConfigurationBuilder {
        JobConfiguration::builder(["a.png", "b.jpg"], "out")
    }

    #[test]
    fn builder_defaults() {
        let job = builder().build().unwrap();
        assert_eq!(job.dimensions(), (800, 600));
        assert_eq!(job.format(), OutputFormat::Jpeg);
        assert_eq!(job.quality(), 85);
        assert_eq!(job.resize_mode(), ResizeMode::Stretch);
        assert_eq!(job.collision_policy(), CollisionPolicy::Overwrite);
        assert_eq!(job.concurrency(), 1);
        assert_eq!(job.sources().len(), 2);
        assert_eq!(job.output_dir(), Path::new("out"));
    }

    #[test]
    fn rejects_empty_source_list() {
        let err = JobConfiguration::builder(Vec::<PathBuf>::new(), "out")
            .build()
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptySourceList));
    }

    #[test]
    fn rejects_zero_dimensions() {
        for (w, h) in [(0, 10), (10, 0), (0, 0)] {
            let err = builder().dimensions(w, h).build().unwrap_err();
            assert!(matches!(err, BatchError::InvalidDimensions { .. }));
        }
    }

    #[test]
    fn rejects_dimensions_over_limit() {
        let err = builder()
            .dimensions(MAX_DIMENSION + 1, 10)
            .build()
            .unwrap_err();
        assert!(matches!(err, BatchError::DimensionExceedsLimit { .. }));
    }

    #[test]
    fn quality_bounds_are_inclusive() {
        assert_eq!(builder().quality(1).build().unwrap().quality(), 1);
        assert_eq!(builder().quality(100).build().unwrap().quality(), 100);
        assert!(matches!(
            builder().quality(0).build().unwrap_err(),
            BatchError::InvalidQuality { quality: 0 }
        ));
        assert!(matches!(
            builder().quality(101).build().unwrap_err(),
            BatchError::InvalidQuality { quality: 101 }
        ));
    }

    #[test]
    fn string_setters_surface_parse_errors_at_build() {
        let err = builder().format_str("psd").build().unwrap_err();
        assert!(matches!(err, BatchError::UnsupportedFormat { .. }));

        let err = builder().resize_mode_str("zoom").build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidResizeMode { .. }));

        let err = builder().collision_policy_str("merge").build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidCollisionPolicy { .. }));

        let job = builder()
            .format_str("png")
            .resize_mode_str("letterbox-center")
            .collision_policy_str("suffix")
            .build()
            .unwrap();
        assert_eq!(job.format(), OutputFormat::Png);
        assert_eq!(job.resize_mode(), ResizeMode::LetterboxCenter);
        assert_eq!(job.collision_policy(), CollisionPolicy::Suffix);
    }

    #[test]
    fn rejects_oversized_concurrency() {
        let err = builder()
            .concurrency(MAX_CONCURRENCY + 1)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("concurrency"));
        assert!(builder().concurrency(0).build().is_ok());
    }

    #[test]
    fn all_validation_errors_are_configuration_errors() {
        let err = builder().quality(0).build().unwrap_err();
        assert!(!err.is_item_level());
    }
}

// src/engine/tasks.rs
//
// One unit of batch work: read, decode, resize, encode, write a single source.
// Every failure (including a contained panic) becomes a failed outcome.

use crate::engine::common::{run_with_panic_policy, EngineResult};
use crate::engine::decoder::decode_image;
use crate::engine::encoder::{encode, prepare_for_format};
use crate::engine::io::{write_atomic, Source};
use crate::engine::pipeline::apply_resize;
use crate::error::BatchError;
use crate::job::JobConfiguration;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Result of processing one source.
#[derive(Clone, Debug)]
pub struct ProcessingOutcome {
    pub source: PathBuf,
    pub status: OutcomeStatus,
}

#[derive(Clone, Debug)]
pub enum OutcomeStatus {
    Succeeded { output_path: PathBuf },
    Failed { cause: BatchError },
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.status {
            OutcomeStatus::Succeeded { output_path } => Some(output_path),
            OutcomeStatus::Failed { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&BatchError> {
        match &self.status {
            OutcomeStatus::Succeeded { .. } => None,
            OutcomeStatus::Failed { cause } => Some(cause),
        }
    }

    /// Log line for this outcome.
    ///
    /// Failures read `[PIXBATCH_*] <source>: <cause>`.
    pub fn log_message(&self) -> String {
        match &self.status {
            OutcomeStatus::Succeeded { output_path } => format!(
                "processed: {} -> {}",
                self.source.display(),
                output_path.display()
            ),
            OutcomeStatus::Failed { cause } => format!(
                "[{}] {}: {}",
                cause.category().code(),
                self.source.display(),
                cause
            ),
        }
    }
}

/// One source of a job together with the output path assigned to it.
///
/// `target` is an error when output naming already failed (collision policy).
#[derive(Clone, Copy, Debug)]
pub struct ImageTask<'a> {
    pub source: &'a Path,
    pub target: &'a EngineResult<PathBuf>,
    pub config: &'a JobConfiguration,
}

impl<'a> ImageTask<'a> {
    pub fn new(
        source: &'a Path,
        target: &'a EngineResult<PathBuf>,
        config: &'a JobConfiguration,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// Process the source. Never panics and never returns early for the batch.
    pub fn process(&self) -> ProcessingOutcome {
        let started = Instant::now();
        let result = run_with_panic_policy("item", || self.process_inner());

        let status = match result {
            Ok(output_path) => {
                debug!(
                    source = %self.source.display(),
                    output = %output_path.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "item processed"
                );
                OutcomeStatus::Succeeded { output_path }
            }
            Err(cause) => {
                warn!(
                    source = %self.source.display(),
                    category = cause.category().as_str(),
                    error = %cause,
                    "item failed"
                );
                OutcomeStatus::Failed { cause }
            }
        };

        ProcessingOutcome {
            source: self.source.to_path_buf(),
            status,
        }
    }

    fn process_inner(&self) -> EngineResult<PathBuf> {
        let output_path = self.target.as_ref().map_err(Clone::clone)?.clone();
        let config = self.config;

        let source = Source::open(self.source)?;
        let (img, detected) = decode_image(source.as_bytes())?;
        debug!(
            source = %self.source.display(),
            format = ?detected,
            width = img.width(),
            height = img.height(),
            "decoded"
        );
        // release the mapping before the heavy work
        drop(source);

        let img = prepare_for_format(img, config.format());
        let (width, height) = config.dimensions();
        let resized = run_with_panic_policy("resize", || {
            apply_resize(img, config.resize_mode(), width, height)
        })?;

        let encoded = encode(&resized, config.format(), config.quality())?;
        debug!(
            source = %self.source.display(),
            format = %config.format(),
            bytes = encoded.len(),
            "encoded"
        );

        write_atomic(&output_path, &encoded)?;
        Ok(output_path)
    }
}

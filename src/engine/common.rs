// src/engine/common.rs
//
// Common utilities shared across engine modules.
// Provides the engine result alias and the codec panic policy.

use crate::error::BatchError;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result type used throughout the engine.
pub type EngineResult<T> = std::result::Result<T, BatchError>;

/// Run a codec step, turning a panic inside it into an `InternalPanic` error.
///
/// Decoders and encoders wrap native libraries (mozjpeg, libdeflate) that
/// signal some failures by unwinding. One bad file must not take the
/// whole batch down with it.
pub fn run_with_panic_policy<T, F>(stage: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!(stage, panic = %detail, "codec panicked; item marked as failed");
            Err(BatchError::internal_panic(format!("{stage}: {detail}")))
        }
    }
}

// src/engine/pool.rs
//
// Worker pool sizing for parallel jobs.
//
// Each parallel run builds its own rayon pool sized to the job's concurrency
// and drops it when the run ends. Sequential runs (concurrency 1) never touch
// rayon here.

use crate::error::BatchError;
use rayon::ThreadPool;

/// Maximum allowed concurrency value for a job
pub const MAX_CONCURRENCY: usize = 1024;

/// Minimum number of worker threads to ensure at least some parallelism
const MIN_WORKER_THREADS: usize = 1;

/// Resolve a job's requested concurrency to a worker count.
///
/// - 0 means auto: `available_parallelism()` (respects cgroup/CPU quota)
/// - anything else is used as-is, capped at `MAX_CONCURRENCY`
pub fn effective_concurrency(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(MIN_WORKER_THREADS)
            .min(MAX_CONCURRENCY)
    } else {
        requested.min(MAX_CONCURRENCY)
    }
}

/// Build a dedicated pool with `threads` workers.
pub(crate) fn build_pool(threads: usize) -> Result<ThreadPool, BatchError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(MIN_WORKER_THREADS))
        .thread_name(|i| format!("pixbatch-worker-{i}"))
        .build()
        .map_err(|e| BatchError::internal_panic(format!("failed to build worker pool: {e}")))
}

// src/engine/api.rs
//
// BatchProcessor: the public entry point that runs a job and reports events.

use crate::engine::common::EngineResult;
use crate::engine::events::{progress_percent, ChannelSink, EventSink, JobEvent, JobSummary, LogRecord};
use crate::engine::io::OutputNamer;
use crate::engine::pool::{build_pool, effective_concurrency};
use crate::engine::tasks::{ImageTask, OutcomeStatus, ProcessingOutcome};
use crate::error::{BatchError, Result};
use crate::job::JobConfiguration;
use crossbeam_channel::Receiver;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Runs a validated job.
///
/// Usage:
/// ```no_run
/// use pixbatch::{BatchProcessor, JobConfiguration, JobEvent};
///
/// let config = JobConfiguration::builder(["a.png", "b.jpg"], "out")
///     .dimensions(200, 200)
///     .format_str("png")
///     .build()?;
/// let handle = BatchProcessor::new(config).run()?;
/// for event in handle.events().iter() {
///     if let JobEvent::Log(record) = event {
///         println!("{record}");
///     }
/// }
/// let summary = handle.wait()?;
/// # Ok::<(), pixbatch::BatchError>(())
/// ```
#[derive(Clone, Debug)]
pub struct BatchProcessor {
    config: Arc<JobConfiguration>,
}

impl BatchProcessor {
    pub fn new(config: JobConfiguration) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &JobConfiguration {
        &self.config
    }

    /// Start the job on a background thread and return its event stream.
    ///
    /// Fails only when the output directory cannot be created; in that case
    /// nothing is processed and no event is emitted. Item failures are
    /// reported through the stream.
    pub fn run(&self) -> Result<JobHandle> {
        self.prepare_output_dir()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let config = Arc::clone(&self.config);
        let thread = thread::Builder::new()
            .name("pixbatch-job".to_string())
            .spawn(move || execute(&config, &mut ChannelSink(tx)))
            .map_err(|e| BatchError::internal_panic(format!("failed to spawn job thread: {e}")))?;
        Ok(JobHandle { events: rx, thread })
    }

    /// Run the job on the calling thread, delivering events to `sink`.
    pub fn run_blocking<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<JobSummary> {
        self.prepare_output_dir()?;
        Ok(execute(&self.config, sink))
    }

    /// Run the job on a background thread, delivering events to `sink` (e.g. a closure).
    pub fn spawn<S>(&self, mut sink: S) -> Result<JoinHandle<JobSummary>>
    where
        S: EventSink + Send + 'static,
    {
        self.prepare_output_dir()?;
        let config = Arc::clone(&self.config);
        thread::Builder::new()
            .name("pixbatch-job".to_string())
            .spawn(move || execute(&config, &mut sink))
            .map_err(|e| BatchError::internal_panic(format!("failed to spawn job thread: {e}")))
    }

    fn prepare_output_dir(&self) -> Result<()> {
        let dir = self.config.output_dir();
        let display = dir.display().to_string();
        std::fs::create_dir_all(dir)
            .map_err(|e| BatchError::output_dir_unavailable(display.clone(), e))?;
        if !dir.is_dir() {
            return Err(BatchError::output_dir_unavailable(
                display,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        Ok(())
    }
}

/// A job running on a background thread.
#[derive(Debug)]
pub struct JobHandle {
    events: Receiver<JobEvent>,
    thread: JoinHandle<JobSummary>,
}

impl JobHandle {
    /// Event stream. Iteration ends after `Completed`, when the job thread exits.
    ///
    /// Dropping the handle (or just the receiver side) does not cancel the job.
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Block until the job finishes and return its summary.
    pub fn wait(self) -> Result<JobSummary> {
        self.thread
            .join()
            .map_err(|_| BatchError::internal_panic("job thread panicked"))
    }
}

/// Drive a whole job and emit its events. Never fails: item errors become outcomes.
fn execute<S: EventSink + ?Sized>(config: &JobConfiguration, sink: &mut S) -> JobSummary {
    let total = config.sources().len();
    info!(
        sources = total,
        output_dir = %config.output_dir().display(),
        format = %config.format(),
        mode = %config.resize_mode(),
        width = config.width(),
        height = config.height(),
        quality = config.quality(),
        "job started"
    );

    // Names are fixed in source order up front so every concurrency setting
    // resolves collisions identically.
    let mut namer = OutputNamer::new(
        config.output_dir(),
        config.format().extension(),
        config.collision_policy(),
    );
    let targets: Vec<EngineResult<PathBuf>> = config
        .sources()
        .iter()
        .map(|source| namer.claim(source))
        .collect();
    let tasks: Vec<ImageTask<'_>> = config
        .sources()
        .iter()
        .zip(&targets)
        .map(|(source, target)| ImageTask::new(source, target, config))
        .collect();

    let workers = effective_concurrency(config.concurrency());
    let summary = if workers <= 1 || total <= 1 {
        run_sequential(&tasks, sink)
    } else {
        match build_pool(workers) {
            Ok(pool) => run_parallel(&tasks, &pool, sink),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable; processing sequentially");
                run_sequential(&tasks, sink)
            }
        }
    };

    sink.emit(JobEvent::Progress(100));
    sink.emit(JobEvent::Log(LogRecord::summary(&summary)));
    if summary.all_succeeded() {
        info!(attempted = summary.attempted, "job finished");
    } else {
        warn!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "job finished with failures"
        );
    }
    sink.emit(JobEvent::Completed(summary));
    summary
}

fn report<S: EventSink + ?Sized>(
    sink: &mut S,
    summary: &mut JobSummary,
    outcome: ProcessingOutcome,
) {
    summary.record(&outcome);
    sink.emit(JobEvent::Log(LogRecord::for_outcome(outcome)));
}

fn run_sequential<S: EventSink + ?Sized>(tasks: &[ImageTask<'_>], sink: &mut S) -> JobSummary {
    let total = tasks.len();
    let mut summary = JobSummary::default();
    for (index, task) in tasks.iter().enumerate() {
        sink.emit(JobEvent::Progress(progress_percent(index, total)));
        report(sink, &mut summary, task.process());
    }
    summary
}

/// Partition item indices into groups that share an output path.
///
/// Each group keeps source order and runs on one worker, so the last item
/// to claim a path also writes it last, as in a sequential run. Items
/// without a target get a group of their own.
fn output_groups(tasks: &[ImageTask<'_>]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(tasks.len());
    let mut by_target: HashMap<&Path, usize> = HashMap::new();
    for (index, task) in tasks.iter().enumerate() {
        match task.target {
            Ok(target) => match by_target.entry(target.as_path()) {
                Entry::Occupied(slot) => groups[*slot.get()].push(index),
                Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(vec![index]);
                }
            },
            Err(_) => groups.push(vec![index]),
        }
    }
    groups
}

/// Process items on `pool`, emitting events in source order.
///
/// Workers finish in any order; outcomes wait in a reorder buffer until every
/// earlier item has been reported, so the stream matches the sequential one.
fn run_parallel<S: EventSink + ?Sized>(
    tasks: &[ImageTask<'_>],
    pool: &ThreadPool,
    sink: &mut S,
) -> JobSummary {
    let total = tasks.len();
    let mut summary = JobSummary::default();
    let mut pending: BTreeMap<usize, ProcessingOutcome> = BTreeMap::new();
    let mut next = 0;

    thread::scope(|scope| {
        let (tx, rx) = crossbeam_channel::unbounded::<(usize, ProcessingOutcome)>();
        let groups = output_groups(tasks);
        let workers = scope.spawn(move || {
            pool.install(|| {
                groups.par_iter().for_each_with(tx, |tx, group| {
                    for &index in group {
                        let _ = tx.send((index, tasks[index].process()));
                    }
                });
            });
        });

        sink.emit(JobEvent::Progress(progress_percent(0, total)));
        for (index, outcome) in rx.iter() {
            pending.insert(index, outcome);
            while let Some(outcome) = pending.remove(&next) {
                report(sink, &mut summary, outcome);
                next += 1;
                if next < total {
                    sink.emit(JobEvent::Progress(progress_percent(next, total)));
                }
            }
        }

        if workers.join().is_err() {
            warn!("worker pool panicked; unreported items are marked as failed");
        }
    });

    // Only reachable if the pool died: every item still gets exactly one log line.
    while next < total {
        let outcome = pending.remove(&next).unwrap_or_else(|| ProcessingOutcome {
            source: tasks[next].source.to_path_buf(),
            status: OutcomeStatus::Failed {
                cause: BatchError::internal_panic("worker terminated before reporting"),
            },
        });
        report(sink, &mut summary, outcome);
        next += 1;
        if next < total {
            sink.emit(JobEvent::Progress(progress_percent(next, total)));
        }
    }

    summary
}

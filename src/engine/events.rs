// src/engine/events.rs
//
// What a running job reports: progress, per-item log lines, completion.

use crate::engine::tasks::ProcessingOutcome;
use crossbeam_channel::Sender;
use std::fmt;

/// One notification from a running job.
///
/// For a job of `n` sources the stream is, in order: for each item `i`,
/// `Progress(i * 100 / n)` then one `Log` with `outcome: Some(..)`; then
/// `Progress(100)`, one summary `Log` with `outcome: None`, and `Completed`.
#[derive(Clone, Debug)]
pub enum JobEvent {
    /// Percent complete, 0-100, never decreasing
    Progress(u8),
    Log(LogRecord),
    /// Emitted exactly once, last
    Completed(JobSummary),
}

/// A human-readable log line, with the item outcome it describes (if any).
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub message: String,
    pub outcome: Option<ProcessingOutcome>,
}

impl LogRecord {
    pub fn for_outcome(outcome: ProcessingOutcome) -> Self {
        Self {
            message: outcome.log_message(),
            outcome: Some(outcome),
        }
    }

    pub fn summary(summary: &JobSummary) -> Self {
        Self {
            message: summary.to_string(),
            outcome: None,
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Counts for a finished job. `attempted == succeeded + failed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl JobSummary {
    pub fn record(&mut self, outcome: &ProcessingOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processing complete: {} files attempted ({} succeeded, {} failed)",
            self.attempted, self.succeeded, self.failed
        )
    }
}

/// Receives job events. Called from the thread running the job.
pub trait EventSink {
    fn emit(&mut self, event: JobEvent);
}

impl<F> EventSink for F
where
    F: FnMut(JobEvent),
{
    fn emit(&mut self, event: JobEvent) {
        self(event)
    }
}

/// Forwards events into a crossbeam channel.
///
/// A dropped receiver is not an error: the job keeps running and its outputs
/// are still written; nobody is listening to the events.
#[derive(Clone, Debug)]
pub struct ChannelSink(pub Sender<JobEvent>);

impl EventSink for ChannelSink {
    fn emit(&mut self, event: JobEvent) {
        let _ = self.0.send(event);
    }
}

/// Progress before attempting item `index` of `total`: `floor(index * 100 / total)`.
pub fn progress_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (index as u128 * 100) / total as u128;
    percent.min(100) as u8
}

//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a run progresses
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started { source: String },

    /// Transformer instances bound; `failed` were disabled by `init`
    TransformersInitialized { active: usize, failed: usize },

    /// Directory walk finished
    DetectionComplete {
        directories: usize,
        services: usize,
        artifacts: usize,
        duration: Duration,
    },

    /// A detector returned an error for one directory
    DetectionFailed {
        transformer: String,
        directory: String,
        error: String,
    },

    /// Scheduler round started
    RoundStarted { round: usize, pending: usize },

    /// One transformer finished its share of a round
    TransformerComplete {
        round: usize,
        transformer: String,
        consumed: usize,
        created: usize,
        skipped: usize,
        duration: Duration,
    },

    /// Scheduler round finished
    RoundComplete {
        round: usize,
        created: usize,
        mappings: usize,
        duration: Duration,
    },

    /// Output plan written
    OutputWritten { mappings: usize, failures: usize },

    /// Run completed
    Completed { rounds: usize, total_time: Duration },

    /// Run failed
    Failed { error: String },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

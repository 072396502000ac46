//! Run states, progress events and the cancellation flag
//!
//! The coordinator publishes typed events onto a single-consumer channel;
//! the controlling side owns the read end plus one cancellation flag. No
//! other mutable state crosses the thread boundary.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Lifecycle state of a scraping run
///
/// `Idle` and `Running` are held implicitly: the engine is idle until
/// `start` spawns a run, and the coordinator is running for the whole of
/// `run`. Only the three terminal states are ever stored in a
/// [`ScrapeOutcome`](crate::scrape::ScrapeOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run active yet
    Idle,

    /// Walking listing pages and collecting records
    Running,

    /// Finished normally: cap reached, no next page, or max pages exhausted
    Completed,

    /// Cancelled cooperatively; records collected so far are valid output
    Stopped,

    /// Aborted on a fatal error; partial records are retained
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Stopped => "stopped",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A progress snapshot emitted to the registered observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Records appended to the dataset so far
    pub items_collected: usize,

    /// Human-readable description of what the run is doing
    pub current_status: String,

    /// Whether the run is still active
    pub is_running: bool,
}

/// Events published by a running coordinator
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    Progress(ProgressUpdate),

    /// Terminal: run finished normally with this many records
    Completed { items: usize },

    /// Terminal: run was cancelled with this many records retained
    Stopped { items: usize },

    /// Terminal: run aborted; partial records are retained
    Failed { items: usize, message: String },
}

pub type EventSender = mpsc::UnboundedSender<ScrapeEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ScrapeEvent>;

/// Creates the event channel connecting a run to its observer.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Cancellation flag, safe to set from the controlling thread and polled by
/// the worker at the top of the per-page loop
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

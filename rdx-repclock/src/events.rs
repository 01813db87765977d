//! Defines the progress snapshot and the event stream published by the
//! scheduler.

use crate::cue::{Cue, IDLE_DISPLAY};
use serde::Serialize;
use tokio::time::Instant;

/// What an observer sees on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// `00:00` while idle or in the lead-in, `mm:ss` while counting,
    /// `Finish!` after completion.
    pub display_text: String,
    /// The rep most recently announced.
    pub current_rep: u32,
    /// Whether a run is in progress.
    pub running: bool,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            display_text: IDLE_DISPLAY.to_string(),
            current_rep: 0,
            running: false,
        }
    }
}

/// Lifecycle state of the scheduler.
///
/// There is no separate paused state: pausing returns to `Idle` and keeps the
/// last display text, rep and total reps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Completed,
}

/// A point-in-time view of the scheduler.
#[derive(Debug, Clone)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub progress: Progress,
    pub total_reps: u32,
    /// Seconds already processed in the current or last run.
    pub elapsed_secs: u32,
    /// When the current or last run started. `None` after a reset.
    pub started_at: Option<Instant>,
}

/// Events broadcast by the scheduler as a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A run began.
    Started { total_reps: u32, total_duration_secs: u32 },
    /// One second was processed and these cues were emitted.
    Tick { elapsed_secs: u32, cues: Vec<Cue> },
    /// The run was paused. Display and rep are frozen.
    Paused { current_rep: u32 },
    /// The scheduler was reset to its idle defaults.
    Reset,
    /// The run was stopped explicitly. `reps_completed` is `None` when no rep
    /// had been finished.
    Stopped { reps_completed: Option<u32> },
    /// The run reached its final second.
    Completed { total_reps: u32 },
}

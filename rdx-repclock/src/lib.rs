//! # Repclock
//!
//! A drift-free repetition countdown engine for Rust.
//!
//! Repclock drives a second-by-second countdown over a fixed-length
//! repetition cycle, fires sound and speech cues at fixed offsets inside each
//! cycle, and reports rep/time progress to any number of observers.
//!
//! ## Core Concepts
//!
//! - **ClockSource**: The single source of time. Every tick target is computed
//!   from the run's start timestamp, so sleep overshoot never accumulates.
//! - **Cue Table**: A pure mapping from a second inside the repetition cycle to
//!   the cues due at that instant (`.` `.` `*` `.` `.` `*`).
//! - **Scheduler**: `RepCycleScheduler` owns one run at a time and can be
//!   paused, reset or stopped from any task.
//! - **Collaborators**: The exercise catalog, the per-category selection store
//!   and the training log are plain stores that degrade to empty values on
//!   I/O failure. `TrainingSession` ties them together.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use repclock::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create the scheduler with a sink that logs every cue.
//!     let scheduler = RepCycleScheduler::new(
//!         RepClockConfig::default(),
//!         SystemClock,
//!         Arc::new(TracingCueSink),
//!     );
//!
//!     // 2. Watch progress.
//!     scheduler
//!         .on_progress(|p: &Progress| println!("{} rep {}", p.display_text, p.current_rep))
//!         .await;
//!
//!     // 3. Run three repetitions and wait for the run to finish.
//!     scheduler.start(3).await;
//!     scheduler.join().await;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Rep Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod catalog;
pub mod common;
pub mod config;
pub mod cue;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod sink;
pub mod time;
pub mod training_log;

/// A prelude module for easy importing of the most common Repclock types.
pub mod prelude {
    pub use crate::catalog::{CsvCatalog, Exercise, ExerciseCatalog};
    pub use crate::common::ObserverId;
    pub use crate::config::{CompletionPolicy, ReadyPhase, RepClockConfig};
    pub use crate::cue::{Cue, Sound, REPETITION_DURATION_SECS};
    pub use crate::events::{Progress, SchedulerEvent, TimerPhase, TimerSnapshot};
    pub use crate::scheduler::RepCycleScheduler;
    pub use crate::session::TrainingSession;
    pub use crate::sink::{CueSink, ProgressObserver, TracingCueSink};
    pub use crate::time::{ClockSource, SystemClock};
}

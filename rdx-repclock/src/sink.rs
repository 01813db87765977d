//! Collaborator contracts for consuming cues and progress.

use crate::cue::Sound;
use crate::events::Progress;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

/// Consumes sound and speech cues.
///
/// Both methods are fire-and-forget: they must return promptly and must not
/// block the tick task. A new `speak` request should interrupt any speech
/// still playing. Errors are logged by the scheduler and otherwise ignored.
pub trait CueSink: Send + Sync {
    fn play_sound(&self, sound: Sound) -> anyhow::Result<()>;
    fn speak(&self, text: &str) -> anyhow::Result<()>;
}

/// Receives a progress snapshot on every update.
///
/// Called from the tick task; implementations that drive a UI are expected
/// to marshal to their own context.
pub trait ProgressObserver: Send + Sync {
    fn on_update(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_update(&self, progress: &Progress) {
        self(progress)
    }
}

/// A sink that only logs cues. Useful headless and in the demo binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCueSink;

impl CueSink for TracingCueSink {
    fn play_sound(&self, sound: Sound) -> anyhow::Result<()> {
        info!(?sound, "play");
        Ok(())
    }

    fn speak(&self, text: &str) -> anyhow::Result<()> {
        info!(text, "speak");
        Ok(())
    }
}

/// Runs one collaborator call, containing both errors and panics.
pub(crate) fn isolate<F>(what: &str, call: F)
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{what} failed: {e:#}"),
        Err(_) => warn!("{what} panicked; continuing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn isolate_swallows_errors_and_panics() {
        isolate("failing sink", || anyhow::bail!("speech engine unavailable"));
        isolate("panicking sink", || panic!("sound pool released"));

        let ran = AtomicBool::new(false);
        isolate("healthy sink", || {
            ran.store(true, Ordering::Relaxed);
            Ok(())
        });
        assert!(ran.load(Ordering::Relaxed));
    }

    #[test]
    fn closures_are_observers() {
        let seen = AtomicBool::new(false);
        let observer = |p: &Progress| {
            if p.current_rep == 2 {
                seen.store(true, Ordering::Relaxed);
            }
        };
        observer.on_update(&Progress {
            display_text: "00:07".into(),
            current_rep: 2,
            running: true,
        });
        assert!(seen.load(Ordering::Relaxed));
    }
}

//! The time source that drives every countdown.

use std::future::Future;
use tokio::time::Instant;

/// A monotonic clock with cooperative, cancelable suspension.
///
/// The scheduler never measures intervals by counting sleeps. It asks for
/// `now()` once at start and then sleeps until absolute targets derived from
/// that instant, so an implementation is free to overshoot.
///
/// Dropping the future returned by `sleep_until` must cancel the sleep; the
/// scheduler relies on this to abort a run mid-second.
pub trait ClockSource: Send + Sync + 'static {
    /// Current monotonic timestamp.
    fn now(&self) -> Instant;

    /// Suspends until `deadline`. Returns immediately if it has already passed.
    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send;
}

/// The production clock, backed by the tokio timer.
///
/// Under `tokio::time::pause()` this clock runs on virtual time, which is how
/// the scheduler tests execute full runs instantly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send {
        tokio::time::sleep_until(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn sleeps_until_absolute_deadline() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep_until(start + Duration::from_secs(3)).await;
        assert_eq!(clock.now() - start, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_returns_immediately() {
        let clock = SystemClock;
        let start = clock.now();
        tokio::time::advance(Duration::from_secs(5)).await;
        clock.sleep_until(start + Duration::from_secs(1)).await;
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }
}

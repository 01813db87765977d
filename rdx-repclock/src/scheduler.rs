//! The repetition-cycle scheduler that drives a single countdown run.

use crate::common::ObserverId;
use crate::config::RepClockConfig;
use crate::cue::{
    cues_for_tick, display_text, total_duration_secs, Cue, FINISH_DISPLAY, FINISH_SPEECH,
};
use crate::events::{Progress, SchedulerEvent, TimerPhase, TimerSnapshot};
use crate::sink::{isolate, CueSink, ProgressObserver};
use crate::time::{ClockSource, SystemClock};
use slotmap::SlotMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Mutable run state. Only ever touched under the scheduler's state lock,
/// which is the single point where the tick task and `pause`/`reset`/`stop`
/// are linearized.
struct RunState {
    phase: TimerPhase,
    progress: Progress,
    total_reps: u32,
    elapsed_secs: u32,
    started_at: Option<Instant>,
    /// Bumped on every start; a tick task exits once its generation is stale.
    generation: u64,
    /// Wakes the tick task out of its sleep.
    cancel: Option<broadcast::Sender<()>>,
}

impl RunState {
    fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            progress: Progress::default(),
            total_reps: 0,
            elapsed_secs: 0,
            started_at: None,
            generation: 0,
            cancel: None,
        }
    }

    fn cancel_run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.send(()).ok();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == TimerPhase::Running
    }
}

/// Drives one countdown run at a time.
///
/// The scheduler is a cheap, cloneable handle. Every clone controls the same
/// run, so `pause` or `reset` may be called from any task while the tick
/// task is sleeping.
///
/// Each second `n` of a run is processed no earlier than `start + n` seconds,
/// measured by the `ClockSource`. Targets never depend on when the previous
/// tick actually woke up; a late wake-up is absorbed by the next sleep being
/// shorter, or skipped entirely if that target has also passed.
pub struct RepCycleScheduler<C: ClockSource = SystemClock> {
    config: Arc<RepClockConfig>,
    clock: Arc<C>,
    sink: Arc<dyn CueSink>,
    state: Arc<RwLock<RunState>>,
    observers: Arc<RwLock<SlotMap<ObserverId, Box<dyn ProgressObserver>>>>,
    event_sender: broadcast::Sender<SchedulerEvent>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<C: ClockSource> Clone for RepCycleScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            clock: self.clock.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
            observers: self.observers.clone(),
            event_sender: self.event_sender.clone(),
            task: self.task.clone(),
        }
    }
}

// Core implementation block for the tick task.
impl<C: ClockSource> RepCycleScheduler<C> {
    /// Creates an idle scheduler.
    pub fn new(config: RepClockConfig, clock: C, sink: Arc<dyn CueSink>) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            config: Arc::new(config),
            clock: Arc::new(clock),
            sink,
            state: Arc::new(RwLock::new(RunState::idle())),
            observers: Arc::new(RwLock::new(SlotMap::with_key())),
            event_sender,
            task: Arc::new(Mutex::new(None)),
        }
    }

    #[doc(hidden)]
    async fn tick_loop(
        self,
        generation: u64,
        started_at: Instant,
        total_duration: u32,
        mut cancel_rx: broadcast::Receiver<()>,
    ) {
        let lead_in = self.config.ready_phase.lead_in_cycles();

        for elapsed in 0..total_duration {
            let target = started_at + Duration::from_secs(u64::from(elapsed));
            if !self.sleep_or_cancel(target, &mut cancel_rx).await {
                return;
            }

            let mut state = self.state.write().await;
            if !state.is_current(generation) {
                return;
            }

            let cues = cues_for_tick(elapsed, lead_in);
            for cue in &cues {
                if let Cue::RepUpdate(rep) = cue {
                    state.progress.current_rep = *rep;
                }
            }
            state.progress.display_text = display_text(elapsed, lead_in);
            state.elapsed_secs = elapsed + 1;
            debug!(
                "Tick {}/{} ({}, rep {}).",
                elapsed + 1,
                total_duration,
                state.progress.display_text,
                state.progress.current_rep
            );

            self.notify_observers(&state.progress).await;
            self.emit_cues(&cues);
            self.event_sender
                .send(SchedulerEvent::Tick {
                    elapsed_secs: elapsed,
                    cues,
                })
                .ok();
        }

        // The last second must have fully elapsed before announcing completion.
        let finish_at = started_at + Duration::from_secs(u64::from(total_duration));
        if !self.sleep_or_cancel(finish_at, &mut cancel_rx).await {
            return;
        }

        let mut state = self.state.write().await;
        if !state.is_current(generation) {
            return;
        }
        state.phase = TimerPhase::Completed;
        state.cancel = None;
        state.progress = Progress {
            display_text: FINISH_DISPLAY.to_string(),
            current_rep: state.total_reps,
            running: false,
        };
        info!("Run complete after {} reps.", state.total_reps);

        self.notify_observers(&state.progress).await;
        isolate("speech cue", || self.sink.speak(FINISH_SPEECH));
        self.event_sender
            .send(SchedulerEvent::Completed {
                total_reps: state.total_reps,
            })
            .ok();
    }

    /// Sleeps until `target`. Returns `false` if the run was cancelled first.
    #[doc(hidden)]
    async fn sleep_or_cancel(
        &self,
        target: Instant,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> bool {
        tokio::select! {
            biased;
            _ = cancel_rx.recv() => false,
            _ = self.clock.sleep_until(target) => true,
        }
    }

    #[doc(hidden)]
    fn emit_cues(&self, cues: &[Cue]) {
        for cue in cues {
            trace!(?cue, "emitting cue");
            match cue {
                // Already applied to the run state before observers ran.
                Cue::RepUpdate(_) => {}
                Cue::Speak(text) => isolate("speech cue", || self.sink.speak(text)),
                Cue::Sound(sound) => isolate("sound cue", || self.sink.play_sound(*sound)),
            }
        }
    }

    #[doc(hidden)]
    async fn notify_observers(&self, progress: &Progress) {
        let observers = self.observers.read().await;
        for (_id, observer) in observers.iter() {
            isolate("progress observer", || {
                observer.on_update(progress);
                Ok(())
            });
        }
    }
}

// Public API implementation block.
impl<C: ClockSource> RepCycleScheduler<C> {
    /// Starts a run of `total_reps` reps.
    ///
    /// Returns `false` without touching any state if a run is already in
    /// progress, `total_reps` is zero, or the run would be too long to time.
    pub async fn start(&self, total_reps: u32) -> bool {
        let mut state = self.state.write().await;
        if state.phase == TimerPhase::Running {
            debug!("Ignoring start: a run is already in progress.");
            return false;
        }
        if total_reps == 0 {
            debug!("Ignoring start: no reps requested.");
            return false;
        }

        let Some(total_duration) = self.total_duration_for(total_reps) else {
            warn!("Ignoring start: {} reps is too long a run.", total_reps);
            return false;
        };
        let started_at = self.clock.now();
        let (cancel_tx, cancel_rx) = broadcast::channel(1);

        state.generation += 1;
        state.phase = TimerPhase::Running;
        state.total_reps = total_reps;
        state.elapsed_secs = 0;
        state.started_at = Some(started_at);
        state.cancel = Some(cancel_tx);
        state.progress = Progress {
            running: true,
            ..Progress::default()
        };
        let generation = state.generation;

        info!(
            "Starting run: {} reps over {}s ({:?} ready phase).",
            total_reps, total_duration, self.config.ready_phase
        );
        self.notify_observers(&state.progress).await;
        self.event_sender
            .send(SchedulerEvent::Started {
                total_reps,
                total_duration_secs: total_duration,
            })
            .ok();

        let runner = self.clone();
        let handle = tokio::spawn(async move {
            runner
                .tick_loop(generation, started_at, total_duration, cancel_rx)
                .await
        });
        *self.task.lock().await = Some(handle);
        true
    }

    /// Halts the run at its next suspension point.
    ///
    /// Display text, current rep and total reps keep their last values.
    /// Returns `false` if nothing was running.
    pub async fn pause(&self) -> bool {
        let mut state = self.state.write().await;
        if state.phase != TimerPhase::Running {
            return false;
        }
        state.cancel_run();
        state.phase = TimerPhase::Idle;
        state.progress.running = false;
        info!("Run paused at rep {}.", state.progress.current_rep);

        self.notify_observers(&state.progress).await;
        self.event_sender
            .send(SchedulerEvent::Paused {
                current_rep: state.progress.current_rep,
            })
            .ok();
        true
    }

    /// Cancels any run and returns to the idle defaults, clearing total reps.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.cancel_run();
        state.phase = TimerPhase::Idle;
        state.progress = Progress::default();
        state.total_reps = 0;
        state.elapsed_secs = 0;
        state.started_at = None;
        info!("Scheduler reset.");

        self.notify_observers(&state.progress).await;
        self.event_sender.send(SchedulerEvent::Reset).ok();
    }

    /// Ends the run early and reports how many reps were finished.
    ///
    /// The rep currently being announced is not counted, so stopping during
    /// rep 4 reports 3. Display and rep return to their idle values while
    /// total reps is kept for the next start. Returns `None` if nothing was
    /// running or no rep had been announced yet.
    pub async fn stop(&self) -> Option<u32> {
        let mut state = self.state.write().await;
        let was_running = state.phase == TimerPhase::Running;
        state.cancel_run();

        let reps_completed = if was_running {
            state.progress.current_rep.checked_sub(1)
        } else {
            None
        };
        state.phase = TimerPhase::Idle;
        state.progress = Progress::default();
        state.started_at = None;
        info!("Run stopped; reps completed: {:?}.", reps_completed);

        self.notify_observers(&state.progress).await;
        self.event_sender
            .send(SchedulerEvent::Stopped { reps_completed })
            .ok();
        reps_completed
    }

    /// Waits for the most recently started tick task to exit.
    pub async fn join(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Tick task ended abnormally: {}", e);
            }
        }
    }

    /// Returns the current state.
    pub async fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.read().await;
        TimerSnapshot {
            phase: state.phase,
            progress: state.progress.clone(),
            total_reps: state.total_reps,
            elapsed_secs: state.elapsed_secs,
            started_at: state.started_at,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.phase == TimerPhase::Running
    }

    /// Run length in seconds for `total_reps` under the configured ready phase.
    /// `None` if it overflows a `u32`.
    pub fn total_duration_for(&self, total_reps: u32) -> Option<u32> {
        total_duration_secs(total_reps, self.config.ready_phase.lead_in_cycles())
    }

    pub fn config(&self) -> &RepClockConfig {
        &self.config
    }

    /// Registers an observer that receives every progress update.
    pub async fn add_observer(&self, observer: Box<dyn ProgressObserver>) -> ObserverId {
        self.observers.write().await.insert(observer)
    }

    /// Registers a closure as a progress observer.
    pub async fn on_progress(
        &self,
        observer: impl Fn(&Progress) + Send + Sync + 'static,
    ) -> ObserverId {
        self.add_observer(Box::new(observer)).await
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub async fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.write().await.remove(id).is_some()
    }

    /// Subscribes to the `SchedulerEvent` stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_sender.subscribe()
    }
}

#![allow(dead_code)]

use repclock::prelude::*;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Records every sound and speech request in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    cues: Mutex<Vec<Cue>>,
}

impl RecordingSink {
    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().unwrap().clone()
    }

    pub fn speech(&self) -> Vec<String> {
        self.cues()
            .into_iter()
            .filter_map(|cue| match cue {
                Cue::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn sounds(&self) -> Vec<Sound> {
        self.cues()
            .into_iter()
            .filter_map(|cue| match cue {
                Cue::Sound(sound) => Some(sound),
                _ => None,
            })
            .collect()
    }
}

impl CueSink for RecordingSink {
    fn play_sound(&self, sound: Sound) -> anyhow::Result<()> {
        self.cues.lock().unwrap().push(Cue::Sound(sound));
        Ok(())
    }

    fn speak(&self, text: &str) -> anyhow::Result<()> {
        self.cues.lock().unwrap().push(Cue::Speak(text.to_string()));
        Ok(())
    }
}

/// A sink whose speech backend is broken and whose sound backend panics.
pub struct BrokenSink;

impl CueSink for BrokenSink {
    fn play_sound(&self, _sound: Sound) -> anyhow::Result<()> {
        panic!("sound pool released");
    }

    fn speak(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("text-to-speech engine not initialised")
    }
}

/// A tokio-backed clock that records every requested deadline and oversleeps
/// one chosen call.
pub struct JitterClock {
    pub deadlines: Arc<Mutex<Vec<Instant>>>,
    pub late_call: usize,
    pub overshoot: Duration,
}

impl ClockSource for JitterClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send {
        let call = {
            let mut deadlines = self.deadlines.lock().unwrap();
            deadlines.push(deadline);
            deadlines.len() - 1
        };
        let extra = if call == self.late_call {
            self.overshoot
        } else {
            Duration::ZERO
        };
        tokio::time::sleep_until(deadline + extra)
    }
}

/// Registers an observer that collects every update.
pub async fn record_progress<C: ClockSource>(
    scheduler: &RepCycleScheduler<C>,
) -> Arc<Mutex<Vec<Progress>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    scheduler
        .on_progress(move |p: &Progress| sink.lock().unwrap().push(p.clone()))
        .await;
    log
}

/// Drains whatever events are already buffered.
pub fn drain(rx: &mut broadcast::Receiver<SchedulerEvent>) -> Vec<SchedulerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn scheduler_with(config: RepClockConfig) -> (RepCycleScheduler, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let scheduler = RepCycleScheduler::new(config, SystemClock, sink.clone());
    (scheduler, sink)
}

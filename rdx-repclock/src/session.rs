//! A training session: the category/step/level selection cascade wired to a
//! scheduler and the training log.

use crate::catalog::{CsvCatalog, ExerciseCatalog};
use crate::config::RepClockConfig;
use crate::events::SchedulerEvent;
use crate::scheduler::RepCycleScheduler;
use crate::selection::{CategorySelection, SelectionStore};
use crate::sink::CueSink;
use crate::time::{ClockSource, SystemClock};
use crate::training_log::{TrainingLogEntry, TrainingLogStore};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything the user has currently selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub categories: Vec<String>,
    pub selected_category: String,
    pub steps: Vec<u32>,
    pub selected_step: Option<u32>,
    pub exercises_for_step: Vec<String>,
    pub selected_exercise: String,
    pub levels: Vec<String>,
    pub selected_level: String,
    /// Reps for the next run. Seeded from the catalog, adjustable by hand.
    pub total_reps: u32,
    pub sets: u32,
}

impl SessionState {
    fn clear_from_step(&mut self) {
        self.selected_step = None;
        self.exercises_for_step.clear();
        self.selected_exercise.clear();
        self.clear_from_exercise();
    }

    fn clear_from_exercise(&mut self) {
        self.levels.clear();
        self.clear_level();
    }

    fn clear_level(&mut self) {
        self.selected_level.clear();
        self.total_reps = 0;
        self.sets = 0;
    }
}

/// Drives runs for whatever exercise is selected.
///
/// Selecting a category restores the step and level last chosen in it.
/// When the configured completion policy logs training, a completed run
/// records every rep and an explicit `stop` records the reps finished so far.
pub struct TrainingSession<C: ClockSource = SystemClock> {
    catalog: Arc<dyn ExerciseCatalog>,
    selections: Arc<SelectionStore>,
    training_log: TrainingLogStore,
    scheduler: RepCycleScheduler<C>,
    state: Arc<RwLock<SessionState>>,
    completion_logger: Mutex<Option<JoinHandle<()>>>,
}

impl TrainingSession<SystemClock> {
    /// Builds a session from configuration, loading the catalog and opening
    /// the stores under `storage.data_dir`.
    pub async fn from_config(config: RepClockConfig, sink: Arc<dyn CueSink>) -> Self {
        let catalog = CsvCatalog::load(&config.storage.catalog_path).await;
        let selections = SelectionStore::new(config.storage.selection_path());
        let training_log =
            TrainingLogStore::new(config.storage.training_log_path(), config.storage.timezone);
        let scheduler = RepCycleScheduler::new(config, SystemClock, sink);
        Self::new(scheduler, Arc::new(catalog), selections, training_log)
    }
}

impl<C: ClockSource> TrainingSession<C> {
    pub fn new(
        scheduler: RepCycleScheduler<C>,
        catalog: Arc<dyn ExerciseCatalog>,
        selections: SelectionStore,
        training_log: TrainingLogStore,
    ) -> Self {
        Self {
            catalog,
            selections: Arc::new(selections),
            training_log,
            scheduler,
            state: Arc::new(RwLock::new(SessionState::default())),
            completion_logger: Mutex::new(None),
        }
    }

    pub fn scheduler(&self) -> &RepCycleScheduler<C> {
        &self.scheduler
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Populates categories and selects the first one.
    pub async fn load(&self) {
        let categories = self.catalog.categories();
        info!("Catalog offers {} categories.", categories.len());
        let first = categories.first().cloned();
        self.state.write().await.categories = categories;
        if let Some(category) = first {
            self.select_category(&category).await;
        }
    }

    pub async fn select_category(&self, category: &str) {
        let steps = self.catalog.steps(category);
        let saved = self.selections.get(category).await;
        {
            let mut state = self.state.write().await;
            state.selected_category = category.to_string();
            state.steps = steps.clone();
            if steps.is_empty() {
                state.clear_from_step();
                return;
            }
        }

        let step = saved
            .and_then(|s| s.selected_step)
            .filter(|s| steps.contains(s))
            .unwrap_or(steps[0]);
        self.select_step(step).await;
    }

    /// Selects a step, its first exercise, and the remembered (or first)
    /// level of that exercise.
    pub async fn select_step(&self, step: u32) {
        let category = self.state.read().await.selected_category.clone();
        let mut names: Vec<String> = Vec::new();
        for exercise in self.catalog.exercises_for_step(&category, step) {
            if !names.contains(&exercise.name) {
                names.push(exercise.name);
            }
        }
        let exercise = names.first().cloned().unwrap_or_default();
        {
            let mut state = self.state.write().await;
            state.selected_step = Some(step);
            state.exercises_for_step = names;
            state.selected_exercise = exercise.clone();
        }

        if exercise.is_empty() {
            self.state.write().await.clear_from_exercise();
        } else {
            let levels = self.catalog.levels(&category, step, &exercise);
            let saved = self.selections.get(&category).await;
            self.state.write().await.levels = levels.clone();
            if !levels.is_empty() {
                let level = saved
                    .map(|s| s.selected_level)
                    .filter(|l| levels.contains(l))
                    .unwrap_or_else(|| levels[0].clone());
                self.select_level(&level).await;
            }
        }
        self.persist_selection().await;
    }

    /// Selects another exercise within the current step. The level is
    /// cleared until one is chosen.
    pub async fn select_exercise(&self, exercise: &str) {
        {
            let mut state = self.state.write().await;
            let levels = match state.selected_step {
                Some(step) => self.catalog.levels(&state.selected_category, step, exercise),
                None => Vec::new(),
            };
            state.selected_exercise = exercise.to_string();
            state.levels = levels;
            state.clear_level();
        }
        self.persist_selection().await;
    }

    /// Selects a level and takes its reps and sets from the catalog.
    pub async fn select_level(&self, level: &str) {
        {
            let mut state = self.state.write().await;
            let (total_reps, sets) = state
                .selected_step
                .and_then(|step| {
                    self.catalog.reps_and_sets(
                        &state.selected_category,
                        step,
                        &state.selected_exercise,
                        level,
                    )
                })
                .unwrap_or((0, 0));
            state.selected_level = level.to_string();
            state.total_reps = total_reps;
            state.sets = sets;
        }
        self.persist_selection().await;
    }

    pub async fn increment_total_reps(&self) -> u32 {
        let mut state = self.state.write().await;
        state.total_reps = state.total_reps.saturating_add(1);
        state.total_reps
    }

    pub async fn decrement_total_reps(&self) -> u32 {
        let mut state = self.state.write().await;
        state.total_reps = state.total_reps.saturating_sub(1);
        state.total_reps
    }

    pub async fn set_total_reps(&self, total_reps: u32) {
        self.state.write().await.total_reps = total_reps;
    }

    /// Starts a run with the selected reps. Same rules as
    /// `RepCycleScheduler::start`.
    pub async fn start(&self) -> bool {
        let (total_reps, category, step) = {
            let state = self.state.read().await;
            (
                state.total_reps,
                state.selected_category.clone(),
                state.selected_step,
            )
        };

        let events = self.scheduler.subscribe_events();
        if !self.scheduler.start(total_reps).await {
            return false;
        }

        if self.scheduler.config().completion.logs_training() {
            match step {
                Some(step) => {
                    let log = self.training_log.clone();
                    let handle = tokio::spawn(log_on_completion(events, log, category, step));
                    *self.completion_logger.lock().await = Some(handle);
                }
                None => warn!("No step selected; this run will not be logged."),
            }
        }
        true
    }

    /// Waits for the current run to end and for its training record, if
    /// any, to be written.
    pub async fn join(&self) {
        self.scheduler.join().await;
        let logger = self.completion_logger.lock().await.take();
        if let Some(logger) = logger {
            if let Err(e) = logger.await {
                warn!("Completion logger ended abnormally: {}", e);
            }
        }
    }

    pub async fn pause(&self) -> bool {
        self.scheduler.pause().await
    }

    /// Resets the scheduler and clears the reps for the next run.
    pub async fn reset(&self) {
        self.scheduler.reset().await;
        self.state.write().await.total_reps = 0;
    }

    /// Stops the run early, logging completed reps when the policy asks for it.
    pub async fn stop(&self) -> Option<u32> {
        let reps_completed = self.scheduler.stop().await;
        if let Some(reps) = reps_completed {
            if self.scheduler.config().completion.logs_training() {
                let (category, step) = {
                    let state = self.state.read().await;
                    (state.selected_category.clone(), state.selected_step)
                };
                if let Some(step) = step {
                    self.training_log.append(&category, step, reps).await;
                }
            }
        }
        reps_completed
    }

    pub async fn training_logs(&self) -> Vec<TrainingLogEntry> {
        self.training_log.load().await
    }

    /// Replaces the record at `index`. Returns `false` if there is none or
    /// the edited record could not be written.
    pub async fn update_log(&self, index: usize, entry: TrainingLogEntry) -> bool {
        let mut entries = self.training_log.load().await;
        match entries.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                self.training_log.replace_all(&entries).await
            }
            None => false,
        }
    }

    async fn persist_selection(&self) {
        let (category, selection) = {
            let state = self.state.read().await;
            (
                state.selected_category.clone(),
                CategorySelection {
                    selected_step: state.selected_step,
                    selected_level: state.selected_level.clone(),
                },
            )
        };
        if !category.is_empty() {
            self.selections.put(&category, selection).await;
        }
    }
}

/// Waits for the run that was just started to end and logs it if it
/// completed on its own.
async fn log_on_completion(
    mut events: broadcast::Receiver<SchedulerEvent>,
    log: TrainingLogStore,
    category: String,
    step: u32,
) {
    loop {
        match events.recv().await {
            Ok(SchedulerEvent::Completed { total_reps }) => {
                log.append(&category, step, total_reps).await;
                return;
            }
            Ok(SchedulerEvent::Paused { .. })
            | Ok(SchedulerEvent::Reset)
            | Ok(SchedulerEvent::Stopped { .. }) => {
                debug!("Run ended early; completion logger exiting.");
                return;
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Completion logger skipped {} events.", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

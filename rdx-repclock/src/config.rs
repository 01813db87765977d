//! Defines all configuration structures for the Repclock engine.
//!
//! These structs are deserialized with `serde` and loaded through the `config`
//! crate, so a run's policies and storage locations can live in a TOML file
//! and be overridden from the environment.

use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `REPCLOCK__READY_PHASE=skipped`.
pub const ENV_PREFIX: &str = "REPCLOCK";

/// The top-level configuration for the engine and its stores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepClockConfig {
    /// Whether a run opens with a silent "Ready" cycle before counting reps.
    pub ready_phase: ReadyPhase,

    /// What a finished or stopped run does besides announcing "Finish".
    pub completion: CompletionPolicy,

    /// Locations of the catalog and the persisted stores.
    pub storage: StorageConfig,
}

/// Controls the lead-in cycle that precedes rep counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyPhase {
    /// One full repetition cycle announces "Ready" and keeps the display at
    /// `00:00`. Total duration is `(reps + 1) * 6` seconds.
    #[default]
    Included,
    /// Rep 1 is announced on the very first second. Total duration is
    /// `reps * 6` seconds.
    Skipped,
}

impl ReadyPhase {
    /// Number of repetition cycles that run before rep 1 is announced.
    pub fn lead_in_cycles(self) -> u32 {
        match self {
            ReadyPhase::Included => 1,
            ReadyPhase::Skipped => 0,
        }
    }
}

/// Controls whether runs are written to the training log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// The run stops by itself once every rep is done. Nothing is logged.
    #[default]
    Finish,
    /// Completion logs all reps; an explicit stop logs the reps finished so far.
    FinishAndLog,
}

impl CompletionPolicy {
    pub fn logs_training(self) -> bool {
        matches!(self, CompletionPolicy::FinishAndLog)
    }
}

/// Storage locations for the catalog and the persisted stores.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// CSV file with `category,step,name,level,totalReps,sets` rows.
    pub catalog_path: PathBuf,

    /// Directory holding `selection_state.json` and `training_log.csv`.
    pub data_dir: PathBuf,

    /// Timezone used to date training-log records. Uses IANA names
    /// (e.g. "Asia/Tokyo"). Defaults to UTC.
    pub timezone: Tz,
}

impl StorageConfig {
    pub fn selection_path(&self) -> PathBuf {
        self.data_dir.join("selection_state.json")
    }

    pub fn training_log_path(&self) -> PathBuf {
        self.data_dir.join("training_log.csv")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("exercises.csv"),
            data_dir: PathBuf::from("."),
            timezone: Tz::UTC,
        }
    }
}

impl RepClockConfig {
    /// Loads configuration from an optional TOML file, then applies
    /// `REPCLOCK__*` environment overrides on top.
    ///
    /// A missing file is not an error; every field has a default.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("failed to assemble configuration sources")?
            .try_deserialize()
            .context("failed to deserialize repclock configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_use_canonical_policies() {
        let config = RepClockConfig::default();
        assert_eq!(config.ready_phase, ReadyPhase::Included);
        assert_eq!(config.completion, CompletionPolicy::Finish);
        assert_eq!(config.storage.timezone, Tz::UTC);
        assert_eq!(config.ready_phase.lead_in_cycles(), 1);
        assert!(!config.completion.logs_training());
    }

    #[test]
    fn loads_policies_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repclock.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
ready_phase = "skipped"
completion = "finish_and_log"

[storage]
catalog_path = "data/exercises.csv"
data_dir = "data"
timezone = "Asia/Tokyo"
"#
        )
        .unwrap();

        let config = RepClockConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.ready_phase, ReadyPhase::Skipped);
        assert_eq!(config.ready_phase.lead_in_cycles(), 0);
        assert!(config.completion.logs_training());
        assert_eq!(config.storage.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(
            config.storage.training_log_path(),
            PathBuf::from("data").join("training_log.csv")
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let config = RepClockConfig::load(Some(absent.as_path())).unwrap();
        assert_eq!(config.ready_phase, ReadyPhase::Included);
        assert_eq!(config.storage.catalog_path, PathBuf::from("exercises.csv"));
    }
}

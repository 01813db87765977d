//! The append-only training log: one dated record per finished or stopped run.

use crate::error::StoreError;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const HEADER: &str = "Date,Category,Step,Reps";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One training-log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingLogEntry {
    pub date: NaiveDate,
    pub category: String,
    pub step: u32,
    pub reps: u32,
}

impl TrainingLogEntry {
    /// Rejects values that would split or merge rows once written.
    fn validate(&self) -> Result<(), StoreError> {
        if self.category.contains([',', '\n', '\r']) {
            return Err(StoreError::InvalidField {
                field: "category",
                value: self.category.clone(),
            });
        }
        Ok(())
    }

    fn to_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.date.format(DATE_FORMAT),
            self.category,
            self.step,
            self.reps
        )
    }

    fn from_row(line: usize, row: &str) -> Result<Self, StoreError> {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(StoreError::malformed(
                line,
                format!("expected 4 columns, found {}", fields.len()),
            ));
        }
        let date = NaiveDate::parse_from_str(fields[0], DATE_FORMAT)
            .map_err(|e| StoreError::malformed(line, format!("date {:?}: {e}", fields[0])))?;
        let number = |index: usize, column: &str| {
            fields[index].parse::<u32>().map_err(|e| {
                StoreError::malformed(line, format!("{column} {:?}: {e}", fields[index]))
            })
        };
        Ok(Self {
            date,
            category: fields[1].to_string(),
            step: number(2, "step")?,
            reps: number(3, "reps")?,
        })
    }
}

/// A CSV file of training records with a `Date,Category,Step,Reps` header.
///
/// Failures are logged and never propagated: a failed append is dropped and a
/// failed load returns no entries.
#[derive(Debug, Clone)]
pub struct TrainingLogStore {
    path: PathBuf,
    timezone: Tz,
}

impl TrainingLogStore {
    /// Records are dated in `timezone`.
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Today's date in the store's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Appends a record dated today.
    pub async fn append(&self, category: &str, step: u32, reps: u32) {
        let entry = TrainingLogEntry {
            date: self.today(),
            category: category.to_string(),
            step,
            reps,
        };
        match self.try_append(&entry).await {
            Ok(()) => debug!("Saved training log: {}", entry.to_row()),
            Err(e) => warn!("Could not save training log: {}", e),
        }
    }

    /// All records in file order.
    pub async fn load(&self) -> Vec<TrainingLogEntry> {
        match self.try_load().await {
            Ok(entries) => {
                debug!("Loaded {} training logs.", entries.len());
                entries
            }
            Err(e) => {
                warn!("Could not load training logs: {}", e);
                Vec::new()
            }
        }
    }

    /// Rewrites the whole file with `entries`. Returns `false`, leaving the
    /// file untouched, if any entry cannot be written.
    pub async fn replace_all(&self, entries: &[TrainingLogEntry]) -> bool {
        match self.try_replace_all(entries).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not rewrite training logs: {}", e);
                false
            }
        }
    }

    async fn try_append(&self, entry: &TrainingLogEntry) -> Result<(), StoreError> {
        entry.validate()?;
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        let mut text = String::new();
        if !exists {
            text.push_str(HEADER);
            text.push('\n');
        }
        text.push_str(&entry.to_row());
        text.push('\n');
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.flush().await.map_err(|e| StoreError::io(&self.path, e))
    }

    async fn try_load(&self) -> Result<Vec<TrainingLogEntry>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Training log file does not exist.");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let entries = text
            .lines()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| !row.trim().is_empty())
            .filter_map(|(index, row)| match TrainingLogEntry::from_row(index + 1, row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping training log row: {}", e);
                    None
                }
            })
            .collect();
        Ok(entries)
    }

    async fn try_replace_all(&self, entries: &[TrainingLogEntry]) -> Result<(), StoreError> {
        let mut text = String::from(HEADER);
        text.push('\n');
        for entry in entries {
            entry.validate()?;
            text.push_str(&entry.to_row());
            text.push('\n');
        }
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

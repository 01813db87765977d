//! The exercise catalog: categories, steps, exercises and levels, each level
//! carrying a target rep count and set count.

use crate::error::StoreError;
use std::path::Path;
use tracing::{debug, warn};

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub category: String,
    pub step: u32,
    pub name: String,
    pub level: String,
    pub total_reps: u32,
    pub sets: u32,
}

/// Read-only lookups over the exercise catalog.
///
/// Every list preserves the order in which entries first appear and contains
/// no duplicates. Unknown keys yield empty results.
pub trait ExerciseCatalog: Send + Sync {
    fn categories(&self) -> Vec<String>;
    fn steps(&self, category: &str) -> Vec<u32>;
    fn exercises_for_step(&self, category: &str, step: u32) -> Vec<Exercise>;
    fn levels(&self, category: &str, step: u32, exercise: &str) -> Vec<String>;
    /// `(total_reps, sets)` for one level of one exercise.
    fn reps_and_sets(
        &self,
        category: &str,
        step: u32,
        exercise: &str,
        level: &str,
    ) -> Option<(u32, u32)>;
}

/// A catalog parsed once from a CSV resource and held in memory.
///
/// Expected columns, after a header row:
/// `category,step,name,level,totalReps,sets`.
#[derive(Debug, Clone, Default)]
pub struct CsvCatalog {
    exercises: Vec<Exercise>,
}

impl CsvCatalog {
    /// Reads and parses the catalog file.
    ///
    /// An unreadable file yields an empty catalog and a warning.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let catalog = Self::parse(&text);
                debug!(
                    "Loaded {} exercises from {}.",
                    catalog.exercises.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                warn!("{}", StoreError::io(path, e));
                Self::default()
            }
        }
    }

    /// Parses CSV text. Rows that do not parse are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let exercises = text
            .lines()
            .enumerate()
            .skip(1)
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match parse_row(index + 1, line) {
                Ok(exercise) => Some(exercise),
                Err(e) => {
                    warn!("Skipping catalog row: {}", e);
                    None
                }
            })
            .collect();
        Self { exercises }
    }

    pub fn from_exercises(exercises: Vec<Exercise>) -> Self {
        Self { exercises }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    fn find(&self, category: &str, step: u32, exercise: &str, level: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| {
            e.category == category && e.step == step && e.name == exercise && e.level == level
        })
    }
}

fn parse_row(line: usize, row: &str) -> Result<Exercise, StoreError> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() < 6 {
        return Err(StoreError::malformed(
            line,
            format!("expected 6 columns, found {}", fields.len()),
        ));
    }
    let number = |index: usize, column: &str| {
        fields[index].parse::<u32>().map_err(|e| {
            StoreError::malformed(line, format!("{column} {:?}: {e}", fields[index]))
        })
    };

    Ok(Exercise {
        category: fields[0].to_string(),
        step: number(1, "step")?,
        name: fields[2].to_string(),
        level: fields[3].to_string(),
        total_reps: number(4, "totalReps")?,
        sets: number(5, "sets")?,
    })
}

/// Collects `items` keeping only the first occurrence of each value.
fn distinct<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

impl ExerciseCatalog for CsvCatalog {
    fn categories(&self) -> Vec<String> {
        distinct(self.exercises.iter().map(|e| e.category.clone()))
    }

    fn steps(&self, category: &str) -> Vec<u32> {
        distinct(
            self.exercises
                .iter()
                .filter(|e| e.category == category)
                .map(|e| e.step),
        )
    }

    fn exercises_for_step(&self, category: &str, step: u32) -> Vec<Exercise> {
        self.exercises
            .iter()
            .filter(|e| e.category == category && e.step == step)
            .cloned()
            .collect()
    }

    fn levels(&self, category: &str, step: u32, exercise: &str) -> Vec<String> {
        distinct(
            self.exercises
                .iter()
                .filter(|e| e.category == category && e.step == step && e.name == exercise)
                .map(|e| e.level.clone()),
        )
    }

    fn reps_and_sets(
        &self,
        category: &str,
        step: u32,
        exercise: &str,
        level: &str,
    ) -> Option<(u32, u32)> {
        self.find(category, step, exercise, level)
            .map(|e| (e.total_reps, e.sets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
category,step,name,level,totalReps,sets
Pushups,1,Wall Pushups,Beginner,10,1
Pushups,1,Wall Pushups,Intermediate,25,2
Pushups,1,Wall Pushups,Progression,50,3
Pushups,2,Incline Pushups,Beginner,10,1
Squats,1,Shoulderstand Squats,Beginner,10,1
";

    #[test]
    fn queries_preserve_order_and_deduplicate() {
        let catalog = CsvCatalog::parse(SAMPLE);
        assert_eq!(catalog.categories(), vec!["Pushups", "Squats"]);
        assert_eq!(catalog.steps("Pushups"), vec![1, 2]);
        assert_eq!(
            catalog.levels("Pushups", 1, "Wall Pushups"),
            vec!["Beginner", "Intermediate", "Progression"]
        );
        let step_two = catalog.exercises_for_step("Pushups", 2);
        assert_eq!(step_two.len(), 1);
        assert_eq!(step_two[0].name, "Incline Pushups");
    }

    #[test]
    fn reps_and_sets_read_the_right_columns() {
        let catalog = CsvCatalog::parse(SAMPLE);
        assert_eq!(
            catalog.reps_and_sets("Pushups", 1, "Wall Pushups", "Intermediate"),
            Some((25, 2))
        );
        assert_eq!(catalog.reps_and_sets("Pushups", 9, "Wall Pushups", "Beginner"), None);
    }

    #[test]
    fn unknown_keys_are_empty() {
        let catalog = CsvCatalog::parse(SAMPLE);
        assert!(catalog.steps("Pullups").is_empty());
        assert!(catalog.exercises_for_step("Squats", 4).is_empty());
        assert!(catalog.levels("Squats", 1, "Pistol Squats").is_empty());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let text = "\
category,step,name,level,totalReps,sets
Pushups,one,Wall Pushups,Beginner,10,1
Pushups,1,Wall Pushups
Pushups,1,Wall Pushups,Beginner,10,1

";
        let catalog = CsvCatalog::parse(text);
        assert_eq!(catalog.exercises().len(), 1);
        assert_eq!(catalog.exercises()[0].total_reps, 10);
    }

    #[tokio::test]
    async fn missing_file_yields_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = CsvCatalog::load(dir.path().join("exercises.csv")).await;
        assert!(catalog.is_empty());
        assert!(catalog.categories().is_empty());
    }
}

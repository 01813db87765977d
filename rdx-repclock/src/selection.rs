//! Remembers the last step and level chosen in each category.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The last selection made within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub selected_step: Option<u32>,
    pub selected_level: String,
}

/// A small key-value store keyed by category, persisted as one JSON file.
///
/// The file is read lazily on first access and rewritten on every `put`.
/// Read and write failures are logged; reads then behave as if nothing was
/// saved and writes keep the in-memory value.
pub struct SelectionStore {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, CategorySelection>>>,
}

impl SelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved selection for `category`, if any.
    pub async fn get(&self, category: &str) -> Option<CategorySelection> {
        let mut entries = self.entries.lock().await;
        if entries.is_none() {
            *entries = Some(self.read_all().await);
        }
        let map = entries.get_or_insert_with(BTreeMap::new);
        map.get(category).cloned()
    }

    /// Saves `selection` for `category` and persists the whole store.
    pub async fn put(&self, category: &str, selection: CategorySelection) {
        let mut entries = self.entries.lock().await;
        if entries.is_none() {
            *entries = Some(self.read_all().await);
        }
        let map = entries.get_or_insert_with(BTreeMap::new);
        map.insert(category.to_string(), selection);
        if let Err(e) = self.write_all(map).await {
            warn!("Could not save selection state: {}", e);
        }
    }

    async fn read_all(&self) -> BTreeMap<String, CategorySelection> {
        match self.try_read_all().await {
            Ok(map) => map,
            Err(e) => {
                warn!("Could not read selection state: {}", e);
                BTreeMap::new()
            }
        }
    }

    async fn try_read_all(&self) -> Result<BTreeMap<String, CategorySelection>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No selection state at {}.", self.path.display());
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        Ok(serde_json::from_str(&text)?)
    }

    async fn write_all(&self, map: &BTreeMap<String, CategorySelection>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(step: u32, level: &str) -> CategorySelection {
        CategorySelection {
            selected_step: Some(step),
            selected_level: level.to_string(),
        }
    }

    #[tokio::test]
    async fn saved_selection_survives_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection_state.json");

        let store = SelectionStore::new(&path);
        assert_eq!(store.get("Pushups").await, None);
        store.put("Pushups", selection(3, "Intermediate")).await;
        store.put("Squats", selection(1, "Beginner")).await;

        let reopened = SelectionStore::new(&path);
        assert_eq!(
            reopened.get("Pushups").await,
            Some(selection(3, "Intermediate"))
        );
        assert_eq!(reopened.get("Squats").await, Some(selection(1, "Beginner")));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SelectionStore::new(&path);
        assert_eq!(store.get("Pushups").await, None);
        store.put("Pushups", selection(2, "Beginner")).await;
        assert_eq!(store.get("Pushups").await, Some(selection(2, "Beginner")));
    }

    #[tokio::test]
    async fn unwritable_location_keeps_value_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path().join("missing").join("state.json"));
        store.put("Pullups", selection(1, "Beginner")).await;
        assert_eq!(store.get("Pullups").await, Some(selection(1, "Beginner")));
    }
}

//! Error types for the catalog, selection and training-log stores.
//!
//! These never escape the public store APIs: each store logs them at its
//! boundary and degrades to an empty or default value.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing a backing file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A tabular row did not have the expected shape.
    #[error("malformed row {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// A value cannot be written to a tabular row without corrupting it.
    #[error("{field} {value:?} contains a column or row separator")]
    InvalidField { field: &'static str, value: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

use std::io;

use thiserror::Error;

use crate::types::CategoryName;

/// Error type for fetch, snapshot, and export failures.
///
/// Retry exhaustion and malformed upstream records are not errors; they are
/// reported through `Option` results and logged counts instead.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("transport failure for '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("snapshot for category '{category}' is unavailable: {reason}")]
    SnapshotUnavailable {
        category: CategoryName,
        reason: String,
    },
    #[error("output file {path} is inconsistent: {details}")]
    OutputInconsistent { path: String, details: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}

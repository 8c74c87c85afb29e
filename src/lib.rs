#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// CLI entry point and full-run orchestration.
pub mod app;
/// Run configuration, category table, and credentials.
pub mod config;
/// Centralized constants for requests, export columns, snapshots, and file names.
pub mod constants;
/// Normalization of detail batches and append-only export.
pub mod export;
/// Sequential fetch loop with periodic flushes.
pub mod fetch;
/// Per-run fetch counters.
pub mod metrics;
/// Identifier sources (daily snapshot with local cache).
pub mod source;
/// Ordered-column table of JSON cells.
pub mod table;
/// HTTP and filesystem transports.
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;

#[cfg(test)]
mod test_support;

pub use config::{
    CATEGORIES, Category, Credentials, ExportConfig, MOVIE, RetryPolicy, SubEntitySpec,
};
pub use errors::ExportError;
pub use export::{ExportSummary, export_data, normalize_batch, unpack_credits};
pub use fetch::{DetailFetcher, download_ids};
pub use metrics::FetchReport;
pub use source::{IdentifierSource, InMemoryIdSource, SnapshotIdSource};
pub use table::Table;
pub use transport::fs::OutputStore;
pub use transport::http::{CatalogClient, Pause, ThreadPause};
pub use types::{CategoryName, ColumnName, DetailRecord, RecordId};

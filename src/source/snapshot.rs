use std::io::{BufRead, BufReader, Read};

use chrono::{NaiveDate, Utc};
use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Category;
use crate::constants::export::ID_COLUMN;
use crate::constants::request::SUCCESSFUL_CALL_STATUS_CODE;
use crate::constants::snapshot::{ADULT_COLUMN, COLLECTION_SUFFIX, TITLE_COLUMN};
use crate::errors::ExportError;
use crate::source::IdentifierSource;
use crate::source::date_helpers::{snapshot_date, snapshot_file_name};
use crate::table::Table;
use crate::transport::fs::{OutputStore, needs_header, read_column, write_table};
use crate::transport::http::CatalogClient;
use crate::types::{DetailRecord, RecordId};

/// Rows removed while ingesting a snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotFilterCounts {
    /// Lines that were not JSON objects.
    pub malformed_lines: usize,
    /// Rows whose title marks them as a collection.
    pub collections: usize,
    /// Rows flagged as adult content.
    pub adult: usize,
}

/// Identifier source backed by the provider's daily snapshot and a local CSV cache.
///
/// The cache is created on first use and read as-is afterwards; it is never
/// refreshed while it exists.
pub struct SnapshotIdSource<'a> {
    client: &'a CatalogClient,
    store: &'a OutputStore,
    snapshot_base_url: String,
    today: Option<NaiveDate>,
}

impl<'a> SnapshotIdSource<'a> {
    /// Create a source downloading from `snapshot_base_url` into `store`.
    pub fn new(
        client: &'a CatalogClient,
        store: &'a OutputStore,
        snapshot_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            snapshot_base_url: snapshot_base_url.into(),
            today: None,
        }
    }

    /// Pin the run date used to pick the snapshot file.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// URL of the snapshot for `category` as of the configured run date.
    pub fn snapshot_url(&self, category: &Category) -> String {
        format!(
            "{}/{}",
            self.snapshot_base_url.trim_end_matches('/'),
            snapshot_file_name(category.name, snapshot_date(self.today()))
        )
    }

    /// Identifiers for `category`, downloading the snapshot when no cache exists.
    pub fn load_id_list(&self, category: &Category) -> Result<Vec<RecordId>, ExportError> {
        let path = self.store.ids_path(category.name);
        if needs_header(&path)? {
            self.download_id_list(category)?;
        }
        let raw = read_column(&path, ID_COLUMN)?;
        let mut unparsable = 0usize;
        let ids: Vec<RecordId> = raw
            .iter()
            .filter_map(|value| {
                let parsed = parse_cached_id(value);
                if parsed.is_none() {
                    unparsable += 1;
                }
                parsed
            })
            .collect();
        if unparsable > 0 {
            warn!(
                "[catalog_export:snapshot] skipped {} unparsable ids in {}",
                unparsable,
                path.display()
            );
        }
        info!(
            "[catalog_export:snapshot] loaded {} ids for {}",
            ids.len(),
            category.name
        );
        Ok(ids)
    }

    /// Download, filter, and cache the snapshot for `category`; returns the cached row count.
    pub fn download_id_list(&self, category: &Category) -> Result<usize, ExportError> {
        info!(
            "[catalog_export:snapshot] downloading list of ids for {}",
            category.name
        );
        let url = self.snapshot_url(category);
        let (status, reader) = self.client.open_stream(&url)?;
        if status != SUCCESSFUL_CALL_STATUS_CODE {
            return Err(ExportError::SnapshotUnavailable {
                category: category.name.to_string(),
                reason: format!("GET {url} returned status {status}"),
            });
        }
        let (table, counts) = ingest_snapshot(GzDecoder::new(reader))?;
        if counts != SnapshotFilterCounts::default() {
            info!(
                "[catalog_export:snapshot] dropped {} malformed lines, {} collections, {} adult rows",
                counts.malformed_lines, counts.collections, counts.adult
            );
        }
        self.store.ensure_root()?;
        let path = self.store.ids_path(category.name);
        write_table(&path, &table)?;
        info!(
            "[catalog_export:snapshot] cached {} ids -> {}",
            table.len(),
            path.display()
        );
        Ok(table.len())
    }
}

impl IdentifierSource for SnapshotIdSource<'_> {
    fn load_ids(&self, category: &Category) -> Result<Vec<RecordId>, ExportError> {
        self.load_id_list(category)
    }
}

/// Decode newline-delimited JSON objects into a filtered table.
pub fn ingest_snapshot<R: Read>(reader: R) -> Result<(Table, SnapshotFilterCounts), ExportError> {
    let mut counts = SnapshotFilterCounts::default();
    let mut records: Vec<DetailRecord> = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(record)) => records.push(record),
            _ => counts.malformed_lines += 1,
        }
    }
    if counts.malformed_lines > 0 {
        warn!(
            "[catalog_export:snapshot] skipped {} lines that were not JSON objects",
            counts.malformed_lines
        );
    }
    let mut table = Table::from_records(records);
    filter_snapshot(&mut table, &mut counts);
    Ok((table, counts))
}

/// Drop collection entries and adult rows; each filter runs only when its column exists.
fn filter_snapshot(table: &mut Table, counts: &mut SnapshotFilterCounts) {
    counts.collections = table.retain_rows_by(TITLE_COLUMN, |title| {
        let text = match title {
            Value::String(text) => text.clone(),
            Value::Null => return true,
            other => other.to_string(),
        };
        !text.ends_with(COLLECTION_SUFFIX)
    });
    counts.adult = table.retain_rows_by(ADULT_COLUMN, |adult| adult.as_bool() != Some(true));
}

/// Parse a cached id cell, tolerating float-formatted integers such as `550.0`.
fn parse_cached_id(value: &str) -> Option<RecordId> {
    let value = value.trim();
    value.parse::<RecordId>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite() && *number >= 0.0 && number.fract() == 0.0)
            .map(|number| number as RecordId)
    })
}

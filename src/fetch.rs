//! Sequential fetch loop with periodic flushes to the export stage.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::Category;
use crate::constants::export::ID_COLUMN;
use crate::errors::ExportError;
use crate::export::export_data;
use crate::metrics::FetchReport;
use crate::transport::fs::{OutputStore, read_column};
use crate::transport::http::CatalogClient;
use crate::types::{DetailRecord, RecordId};

/// Fetches one detail payload per identifier.
pub trait DetailFetcher {
    /// `Ok(None)` means the fetch gave up; errors abort the run.
    fn fetch_detail(&self, category: &Category, id: RecordId)
    -> Result<Option<Value>, ExportError>;
}

impl DetailFetcher for CatalogClient {
    fn fetch_detail(
        &self,
        category: &Category,
        id: RecordId,
    ) -> Result<Option<Value>, ExportError> {
        self.make_detail_request(category, id)
    }
}

/// Identifiers already committed to the primary output, as written on disk.
///
/// Missing and zero-byte output files contribute nothing.
pub fn existing_ids(
    store: &OutputStore,
    category: &Category,
) -> Result<HashSet<String>, ExportError> {
    let path = store.data_path(category.name);
    Ok(read_column(&path, ID_COLUMN)?.into_iter().collect())
}

/// Fetch every identifier not yet exported and append results in batches.
///
/// Successful records accumulate in memory and are exported each time the
/// cumulative success count reaches a multiple of `flush_every`, then once more
/// for any remainder. Identifiers whose fetch gives up are logged and skipped;
/// they are not recorded anywhere, so the next run retries them.
pub fn download_ids<F>(
    store: &OutputStore,
    fetcher: &F,
    category: &Category,
    id_list: Vec<RecordId>,
    flush_every: usize,
) -> Result<FetchReport, ExportError>
where
    F: DetailFetcher + ?Sized,
{
    let flush_every = flush_every.max(1);
    let mut report = FetchReport {
        requested: id_list.len(),
        ..FetchReport::default()
    };

    let existing = existing_ids(store, category)?;
    let pending_ids: Vec<RecordId> = if existing.is_empty() {
        id_list
    } else {
        id_list
            .into_iter()
            .filter(|id| !existing.contains(&id.to_string()))
            .collect()
    };
    report.skipped_existing = report.requested - pending_ids.len();
    if report.skipped_existing > 0 {
        info!(
            "[catalog_export:fetch] skipping {} {} ids already exported",
            report.skipped_existing, category.name
        );
    }

    info!(
        "[catalog_export:fetch] downloading details for {} ({} pending)",
        category.name,
        pending_ids.len()
    );
    let mut counter = 0usize;
    let mut batch: Vec<DetailRecord> = Vec::new();
    for id in pending_ids {
        let record = match fetcher.fetch_detail(category, id)? {
            Some(Value::Object(record)) if !record.is_empty() => record,
            _ => {
                warn!("[catalog_export:fetch] failed on id # {}", id);
                report.failed += 1;
                continue;
            }
        };
        counter += 1;
        report.fetched += 1;
        batch.push(record);
        if counter % flush_every == 0 {
            info!(
                "[catalog_export:fetch] finished downloading {} entries for {}",
                counter, category.name
            );
            let summary = export_data(store, category, std::mem::take(&mut batch))?;
            report.record_export(&summary);
        }
    }
    let summary = export_data(store, category, batch)?;
    report.record_export(&summary);
    report.log_summary(category.name);
    Ok(report)
}

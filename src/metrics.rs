use tracing::info;

use crate::export::ExportSummary;

/// Counters for one category's fetch loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Identifiers handed to the loop before dedup.
    pub requested: usize,
    /// Identifiers skipped because the primary output already holds them.
    pub skipped_existing: usize,
    /// Successful detail fetches.
    pub fetched: usize,
    /// Identifiers whose fetch exhausted retries or returned an empty payload.
    pub failed: usize,
    /// Export calls that wrote at least one row.
    pub flushes: usize,
    /// Rows appended to the primary table.
    pub rows_written: usize,
    /// Rows appended to the sub-entity table.
    pub sub_entity_rows_written: usize,
    /// Records dropped during export for missing or non-numeric identifiers.
    pub dropped_records: usize,
}

impl FetchReport {
    /// Fold one export outcome into the running totals.
    pub fn record_export(&mut self, summary: &ExportSummary) {
        if summary.rows_written > 0 {
            self.flushes += 1;
        }
        self.rows_written += summary.rows_written;
        self.sub_entity_rows_written += summary.sub_entity_rows_written;
        self.dropped_records += summary.dropped_missing_id + summary.dropped_non_numeric_id;
    }

    /// Identifiers the loop actually attempted.
    pub fn attempted(&self) -> usize {
        self.fetched + self.failed
    }

    /// Share of attempted identifiers that failed, in `[0, 1]`.
    pub fn failure_ratio(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            0.0
        } else {
            self.failed as f64 / attempted as f64
        }
    }

    /// Emit a one-line summary for `category`.
    pub fn log_summary(&self, category: &str) {
        info!(
            "[catalog_export:fetch] {}: requested={} skipped_existing={} fetched={} failed={} ({:.1}%) rows={} sub_entity_rows={} dropped={} flushes={}",
            category,
            self.requested,
            self.skipped_existing,
            self.fetched,
            self.failed,
            self.failure_ratio() * 100.0,
            self.rows_written,
            self.sub_entity_rows_written,
            self.dropped_records,
            self.flushes
        );
    }
}

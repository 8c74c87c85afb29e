use chrono::NaiveDate;

/// Date of the newest published snapshot for a run happening on `today`.
///
/// Snapshots are published for the previous calendar day, so this steps back
/// one day across month and year boundaries (March 1 yields the last day of
/// February, January 1 yields December 31 of the prior year).
pub fn snapshot_date(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Snapshot file name formatted as `<category>_ids_MM_DD_YYYY.json.gz`.
pub fn snapshot_file_name(category: &str, date: NaiveDate) -> String {
    format!("{category}_ids_{}.json.gz", date.format("%m_%d_%Y"))
}

/// Primary key of one catalog record.
/// Example: `550`
pub type RecordId = u64;
/// Catalog category name used in URLs and file names.
/// Example: `movie`
pub type CategoryName = String;
/// Column name in a tabular export.
/// Examples: `id`, `genres`, `movie_id`
pub type ColumnName = String;
/// Raw detail payload for one identifier as returned by the provider.
pub type DetailRecord = serde_json::Map<String, serde_json::Value>;

//! Batch normalization and append-only CSV export.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Category, SubEntitySpec};
use crate::constants::export::{ID_COLUMN, JSON_COLUMNS, KEYS_TO_DROP};
use crate::errors::ExportError;
use crate::table::Table;
use crate::transport::fs::{OutputStore, append_table, needs_header};
use crate::types::DetailRecord;

/// Column holding the keyword list on detail records.
const KEYWORDS_COLUMN: &str = "keywords";

/// Outcome of one `export_data` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows appended to the primary table.
    pub rows_written: usize,
    /// Rows appended to the sub-entity table.
    pub sub_entity_rows_written: usize,
    /// Records dropped because the identifier was null or missing.
    pub dropped_missing_id: usize,
    /// Records dropped because the identifier was not numeric.
    pub dropped_non_numeric_id: usize,
}

/// Normalized tables for one batch, ready to append.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Primary fields table.
    pub primary: Table,
    /// Sub-entity table, present when the category defines one.
    pub sub_entity: Option<Table>,
    /// Records dropped for a null or missing identifier.
    pub dropped_missing_id: usize,
    /// Records dropped for a non-numeric identifier.
    pub dropped_non_numeric_id: usize,
}

/// Normalize `batch` and append it to the category's output tables.
///
/// Headers are written only when the primary file is missing or still empty;
/// that single check governs both files. An empty batch writes nothing.
pub fn export_data(
    store: &OutputStore,
    category: &Category,
    batch: Vec<DetailRecord>,
) -> Result<ExportSummary, ExportError> {
    if batch.is_empty() {
        return Ok(ExportSummary::default());
    }
    let normalized = normalize_batch(category, batch);
    let mut summary = ExportSummary {
        dropped_missing_id: normalized.dropped_missing_id,
        dropped_non_numeric_id: normalized.dropped_non_numeric_id,
        ..ExportSummary::default()
    };
    if normalized.primary.is_empty() {
        warn!(
            "[catalog_export:export] no exportable {} records left in batch",
            category.name
        );
        return Ok(summary);
    }

    store.ensure_root()?;
    let data_path = store.data_path(category.name);
    let write_header = needs_header(&data_path)?;
    summary.rows_written = append_table(&data_path, &normalized.primary, write_header)?;
    if let Some(sub_entity) = &normalized.sub_entity {
        let credits_path = store.credits_path(category.name);
        summary.sub_entity_rows_written = append_table(&credits_path, sub_entity, write_header)?;
    }
    debug!(
        "[catalog_export:export] appended {} rows to {} (header={})",
        summary.rows_written,
        data_path.display(),
        write_header
    );
    Ok(summary)
}

/// Build the primary and sub-entity tables for a batch without touching disk.
pub fn normalize_batch(category: &Category, batch: Vec<DetailRecord>) -> NormalizedBatch {
    let mut table = Table::from_records(batch);
    table.drop_columns(KEYS_TO_DROP);

    let dropped_missing_id = if table.has_column(ID_COLUMN) {
        table.retain_rows_by(ID_COLUMN, |id| !id.is_null())
    } else {
        let dropped = table.len();
        table = Table::new(table.columns().map(str::to_string).collect::<Vec<_>>());
        dropped
    };
    if dropped_missing_id > 0 {
        info!(
            "[catalog_export:export] dropping {} entries without ids",
            dropped_missing_id
        );
    }
    let dropped_non_numeric_id = table.retain_rows_by(ID_COLUMN, is_numeric_id);
    if dropped_non_numeric_id > 0 {
        info!(
            "[catalog_export:export] dropping {} entries with non-numeric ids",
            dropped_non_numeric_id
        );
    }

    let (mut primary, sub_entity) = match &category.sub_entity {
        Some(spec) => {
            let (primary, derived) = unpack_credits(table, spec);
            (primary, Some(derived))
        }
        None => (table, None),
    };

    if let Some(wrapper) = category.keyword_wrapper {
        unwrap_keywords(&mut primary, wrapper);
    }
    for column in JSON_COLUMNS {
        primary.map_column(column, |cell| Value::String(encode_json_cell(cell)));
    }

    NormalizedBatch {
        primary,
        sub_entity,
        dropped_missing_id,
        dropped_non_numeric_id,
    }
}

/// Split the nested container column into its own table.
///
/// Returns the primary table without the container plus a derived table with
/// one row per parent: parent key, display field, then one JSON text column per
/// configured list with the stripped attribute removed from every object.
pub fn unpack_credits(table: Table, spec: &SubEntitySpec) -> (Table, Table) {
    let mut primary = table;
    let rows = primary.len();
    let containers = primary
        .take_column(spec.container)
        .unwrap_or_else(|| vec![Value::Null; rows]);
    let ids = cloned_column(&primary, ID_COLUMN);
    let display = cloned_column(&primary, spec.display_field);

    let mut derived = Table::new(
        [ID_COLUMN, spec.display_field]
            .into_iter()
            .chain(spec.lists.iter().copied()),
    );
    for ((id, title), container) in ids.into_iter().zip(display).zip(containers) {
        let mut row = vec![id, title];
        for list in spec.lists {
            let items = container
                .get(*list)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let stripped = strip_attribute(items, spec.stripped_attribute);
            row.push(Value::String(Value::Array(stripped).to_string()));
        }
        derived.push_row(row);
    }
    derived.rename_column(ID_COLUMN, spec.parent_key);
    (primary, derived)
}

/// Serialize a list-of-object cell to JSON text; nulls become an empty list.
pub fn encode_json_cell(cell: Value) -> String {
    match cell {
        Value::Null => "[]".to_string(),
        other => other.to_string(),
    }
}

/// Inverse of `encode_json_cell` for reading exported files back.
pub fn decode_json_cell(text: &str) -> Result<Value, ExportError> {
    Ok(serde_json::from_str(text)?)
}

/// True for unsigned JSON integers and all-digit strings.
pub fn is_numeric_id(id: &Value) -> bool {
    match id {
        Value::Number(number) => number.as_u64().is_some(),
        Value::String(text) => !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

fn cloned_column(table: &Table, column: &str) -> Vec<Value> {
    table
        .column(column)
        .map(|cells| cells.into_iter().cloned().collect())
        .unwrap_or_else(|| vec![Value::Null; table.len()])
}

fn strip_attribute(items: Vec<Value>, attribute: &str) -> Vec<Value> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(mut fields) => {
                fields.shift_remove(attribute);
                Value::Object(fields)
            }
            other => other,
        })
        .collect()
}

/// Replace `{"<wrapper>": [...]}` keyword cells with the inner list.
fn unwrap_keywords(table: &mut Table, wrapper: &str) {
    if !table.has_column(KEYWORDS_COLUMN) {
        table.insert_column(KEYWORDS_COLUMN, vec![Value::Array(Vec::new()); table.len()]);
        return;
    }
    table.map_column(KEYWORDS_COLUMN, |cell| match cell {
        Value::Object(mut fields) => fields
            .remove(wrapper)
            .unwrap_or_else(|| Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    });
}

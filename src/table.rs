//! Ordered-column table of JSON cells used between ingestion and CSV output.

use indexmap::IndexSet;
use serde_json::Value;

use crate::types::{ColumnName, DetailRecord};

/// Row-major table whose columns keep first-seen order.
///
/// Cells missing from a source record are stored as `Value::Null`, so every
/// row always has exactly one cell per column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: IndexSet<ColumnName>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Assemble records into a table using the union of their keys.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = DetailRecord>,
    {
        let records: Vec<DetailRecord> = records.into_iter().collect();
        let mut columns = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key.as_str()) {
                    columns.insert(key.clone());
                }
            }
        }
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column.as_str()).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Append a row; short rows are padded with nulls and long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// True when the header contains `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in insertion order, aligned with `columns()`.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.get_index_of(column)?;
        self.rows.get(row).and_then(|cells| cells.get(idx))
    }

    /// All cells of one column, or `None` when the column is absent.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.get_index_of(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Remove every listed column that is present; returns how many were removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        names
            .iter()
            .filter(|name| self.take_column(name).is_some())
            .count()
    }

    /// Remove a column and return its cells.
    pub fn take_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let (idx, _) = self.columns.shift_remove_full(name)?;
        Some(self.rows.iter_mut().map(|row| row.remove(idx)).collect())
    }

    /// Set a column's cells, appending the column when it is new.
    ///
    /// `values` is padded with nulls or truncated to the current row count.
    pub fn insert_column(&mut self, name: impl Into<ColumnName>, mut values: Vec<Value>) {
        values.resize(self.rows.len(), Value::Null);
        let (idx, inserted) = self.columns.insert_full(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            if inserted {
                row.push(value);
            } else {
                row[idx] = value;
            }
        }
    }

    /// Rename a column in place, keeping its position.
    ///
    /// Returns `false` when `from` is missing or `to` already exists.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if self.columns.contains(to) {
            return false;
        }
        let Some(idx) = self.columns.get_index_of(from) else {
            return false;
        };
        self.columns.shift_remove_index(idx);
        self.columns.shift_insert(idx, to.to_string());
        true
    }

    /// Keep rows whose cell in `column` satisfies `keep`; returns the number removed.
    ///
    /// A missing column removes nothing.
    pub fn retain_rows_by<F>(&mut self, column: &str, mut keep: F) -> usize
    where
        F: FnMut(&Value) -> bool,
    {
        let Some(idx) = self.columns.get_index_of(column) else {
            return 0;
        };
        let before = self.rows.len();
        self.rows.retain(|row| keep(&row[idx]));
        before - self.rows.len()
    }

    /// Replace every cell of `column` with `map(cell)`; returns `false` when absent.
    pub fn map_column<F>(&mut self, column: &str, mut map: F) -> bool
    where
        F: FnMut(Value) -> Value,
    {
        let Some(idx) = self.columns.get_index_of(column) else {
            return false;
        };
        for row in &mut self.rows {
            let cell = std::mem::take(&mut row[idx]);
            row[idx] = map(cell);
        }
        true
    }
}

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::constants::files::{CREDITS_SUFFIX, DATA_SUFFIX, IDS_SUFFIX};
use crate::errors::ExportError;
use crate::table::Table;

/// Filesystem layout for the identifier cache and the append-only output tables.
#[derive(Clone, Debug)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding every file of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if needed.
    pub fn ensure_root(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// `<category>_ids.csv`
    pub fn ids_path(&self, category: &str) -> PathBuf {
        self.root.join(format!("{category}{IDS_SUFFIX}"))
    }

    /// `<category>_data.csv`
    pub fn data_path(&self, category: &str) -> PathBuf {
        self.root.join(format!("{category}{DATA_SUFFIX}"))
    }

    /// `<category>_credits.csv`
    pub fn credits_path(&self, category: &str) -> PathBuf {
        self.root.join(format!("{category}{CREDITS_SUFFIX}"))
    }
}

/// Render one JSON cell as CSV text.
///
/// Nulls become empty fields, strings are written raw, and everything else
/// uses its compact JSON form.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Overwrite `path` with the table, header included.
pub fn write_table(path: &Path, table: &Table) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(render_cell))?;
    }
    writer.flush()?;
    Ok(())
}

/// Append the table's rows to `path`, creating the file when missing.
///
/// With `write_header` the table's own column order is written first. Without
/// it, rows are laid out to match the header already in the file so repeated
/// appends stay aligned; cells for columns the file lacks are dropped.
pub fn append_table(path: &Path, table: &Table, write_header: bool) -> Result<usize, ExportError> {
    let existing_header = if write_header {
        None
    } else {
        read_header(path)?
    };

    let layout: Vec<Option<usize>> = match &existing_header {
        Some(header) => {
            let columns: Vec<&str> = table.columns().collect();
            let known: HashSet<&str> = header.iter().map(String::as_str).collect();
            let unknown: Vec<&str> = columns
                .iter()
                .copied()
                .filter(|column| !known.contains(column))
                .collect();
            if !unknown.is_empty() {
                warn!(
                    "[catalog_export:fs] dropping columns absent from {} header: {}",
                    path.display(),
                    unknown.join(", ")
                );
            }
            header
                .iter()
                .map(|name| columns.iter().position(|column| column == name))
                .collect()
        }
        None => (0..table.columns().count()).map(Some).collect(),
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if write_header {
        writer.write_record(table.columns())?;
    }
    for row in table.rows() {
        writer.write_record(layout.iter().map(|slot| match slot {
            Some(idx) => render_cell(&row[*idx]),
            None => String::new(),
        }))?;
    }
    writer.flush()?;
    Ok(table.len())
}

/// Header row of an existing CSV file, or `None` when the file is missing or empty.
pub fn read_header(path: &Path) -> Result<Option<Vec<String>>, ExportError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);
    let header = reader.headers()?;
    if header.is_empty() {
        return Ok(None);
    }
    Ok(Some(header.iter().map(str::to_string).collect()))
}

/// True when `path` is missing or has no header row yet.
///
/// A zero-byte file left by an interrupted first write counts as headerless.
pub fn needs_header(path: &Path) -> Result<bool, ExportError> {
    Ok(read_header(path)?.is_none())
}

/// Every value of one named column, as raw text, in file order.
///
/// A missing or empty file has no values. A file with a header that lacks
/// `column` is reported as inconsistent.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>, ExportError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);
    let header = reader.headers()?;
    if header.is_empty() {
        return Ok(Vec::new());
    }
    let idx = header
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| ExportError::OutputInconsistent {
            path: path.display().to_string(),
            details: format!("missing '{column}' column"),
        })?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(idx) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

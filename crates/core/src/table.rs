//! In-memory employee table and the spreadsheet loader.

use crate::models::{CellValue, EmployeeRecord};
use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table source not found: {0}")]
    NotFound(PathBuf),
    #[error("table source {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Rows with arbitrary named columns. Cells are `None` when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<CellValue>>>,
}

impl Table {
    /// Builds a table; short rows are padded with nulls and long rows truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<CellValue>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[Option<CellValue>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Rows paired with their original position.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &[Option<CellValue>])> {
        self.rows.iter().map(Vec::as_slice).enumerate()
    }

    /// Rows with at least one value, keyed by normalized column name.
    ///
    /// When two headers normalize to the same name the first column wins.
    pub fn records(&self) -> Vec<EmployeeRecord> {
        let names: Vec<String> = self.columns.iter().map(|c| normalize_column(c)).collect();
        self.rows()
            .filter(|(_, row)| row.iter().any(Option::is_some))
            .map(|(row_index, row)| {
                let mut fields = IndexMap::new();
                for (name, cell) in names.iter().zip(row) {
                    if let Some(value) = cell {
                        fields.entry(name.clone()).or_insert_with(|| value.clone());
                    }
                }
                EmployeeRecord { row_index, fields }
            })
            .collect()
    }
}

/// Lower-cases and underscores a header. Idempotent.
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Loads the first worksheet; the first row supplies column names.
pub fn load_table(path: &Path) -> Result<Table, TableError> {
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }
    let malformed = |reason: String| TableError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| malformed(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| malformed("workbook has no sheets".into()))?
        .map_err(|e| malformed(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::empty());
    };
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_value(cell) {
            Some(v) => v.to_string().trim().to_string(),
            None => format!("Unnamed: {i}"),
        })
        .collect();
    let body: Vec<Vec<Option<CellValue>>> =
        rows.map(|row| row.iter().map(cell_value).collect()).collect();

    info!(
        path = %path.display(),
        columns = columns.len(),
        rows = body.len(),
        "loaded table"
    );
    Ok(Table::new(columns, body))
}

fn cell_value(cell: &DataType) -> Option<CellValue> {
    match cell {
        DataType::Empty => None,
        DataType::String(s) if s.trim().is_empty() => None,
        DataType::String(s) => Some(CellValue::Text(s.clone())),
        DataType::Int(i) => Some(CellValue::Int(*i)),
        DataType::Float(f) => Some(CellValue::Float(*f)),
        DataType::Bool(b) => Some(CellValue::Bool(*b)),
        DataType::DateTime(serial) => excel_serial_to_datetime(*serial)
            .map(CellValue::Date)
            .or(Some(CellValue::Float(*serial))),
        DataType::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(CellValue::Date)
            .or_else(|| Some(CellValue::Text(s.clone()))),
        DataType::Error(_) => None,
        other => Some(CellValue::Text(other.to_string())),
    }
}

// Last day Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// Excel serial day numbers count from 1899-12-30. Serials outside Excel's range yield `None`.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(chrono::Duration::try_milliseconds(millis)?)
}

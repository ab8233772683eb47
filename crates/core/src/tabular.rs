//! Tabular file parsing: CSV via the `csv` crate, Excel via `calamine`.
//!
//! Three access patterns, all over raw in-memory bytes:
//!
//! - [`parse_rows`]: full row-major parse with every original column kept.
//! - [`extract_metadata`]: row/column counts without building row maps.
//! - [`column_values`]: every value under one named column.
//!
//! The header row is always row 1 and is never counted as data. Rows with
//! zero non-empty cells are skipped entirely. Cell values are trimmed
//! strings; empty and missing cells become `""`.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::CoreError;

/// Declared type of an uploaded file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Xlsx,
}

impl FileType {
    /// Derive a file type from a filename's extension.
    ///
    /// Allow-list: `.csv`, `.xlsx`, `.xls`. Returns `None` for anything
    /// else so callers can reject before touching the bytes.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            // calamine auto-detects the concrete workbook format.
            "xlsx" | "xls" => Some(Self::Xlsx),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// A fully parsed file: ordered headers plus row-major data.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    /// One map per data row, keyed by header, iteration order = column order.
    pub rows: Vec<IndexMap<String, String>>,
}

/// Lightweight counts extracted without materializing row maps.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableMetadata {
    pub row_count: usize,
    pub column_count: usize,
}

/// Full parse into header→value rows.
pub fn parse_rows(bytes: &[u8], file_type: FileType) -> Result<ParsedTable, CoreError> {
    let raw = raw_rows(bytes, file_type)?;
    let mut iter = raw.into_iter();
    let headers = iter.next().unwrap_or_default();

    let rows = iter
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect::<IndexMap<String, String>>()
        })
        .collect();

    Ok(ParsedTable { headers, rows })
}

/// Metadata-only pass: counts of data rows and header columns.
pub fn extract_metadata(bytes: &[u8], file_type: FileType) -> Result<TableMetadata, CoreError> {
    let raw = raw_rows(bytes, file_type)?;
    let column_count = raw.first().map(Vec::len).unwrap_or(0);
    let row_count = raw
        .iter()
        .skip(1)
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .count();
    Ok(TableMetadata {
        row_count,
        column_count,
    })
}

/// The header names (row 1), trimmed, in file order.
pub fn extract_headers(bytes: &[u8], file_type: FileType) -> Result<Vec<String>, CoreError> {
    let raw = raw_rows(bytes, file_type)?;
    Ok(raw.into_iter().next().unwrap_or_default())
}

/// Every value found under one named column, in row order.
///
/// Empty rows are skipped (consistent with [`parse_rows`]); empty cells in
/// surviving rows are returned as `""` so callers can count non-empty
/// values themselves.
pub fn column_values(
    bytes: &[u8],
    file_type: FileType,
    column: &str,
) -> Result<Vec<String>, CoreError> {
    let raw = raw_rows(bytes, file_type)?;
    let mut iter = raw.into_iter();
    let headers = iter.next().unwrap_or_default();
    let idx = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| CoreError::Validation(format!("Unknown column '{column}'")))?;

    Ok(iter
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| cells.get(idx).cloned().unwrap_or_default())
        .collect())
}

// ── Format-specific readers ──────────────────────────────────────────

/// Parse into raw rows of trimmed cell strings, header row included.
fn raw_rows(bytes: &[u8], file_type: FileType) -> Result<Vec<Vec<String>>, CoreError> {
    match file_type {
        FileType::Csv => csv_rows(bytes),
        FileType::Xlsx => excel_rows(bytes),
    }
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, CoreError> {
    let delimiter = sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| CoreError::Parse(format!("Malformed CSV: {e}")))?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Pick the most frequent of `;`, `,` and tab in the first line.
///
/// Supplier exports are split roughly evenly between comma and semicolon;
/// sniffing the header line is cheap and covers both without a config knob.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(b"");
    [b';', b',', b'\t']
        .into_iter()
        .max_by_key(|d| first_line.iter().filter(|b| *b == d).count())
        .unwrap_or(b',')
}

fn excel_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, CoreError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| CoreError::Parse(format!("Unreadable spreadsheet: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CoreError::Parse("Spreadsheet has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CoreError::Parse(format!("Failed to read sheet '{sheet_name}': {e}")))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

/// Render a spreadsheet cell as a trimmed string.
///
/// Integral floats are rendered without a decimal point: EAN columns are
/// frequently stored as numbers, and `8712345678901.0` must come out as
/// `8712345678901`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            format!("{}", *f as i64)
        }
        other => other.to_string().trim().to_string(),
    }
}

//! In-memory CSV table with named columns.
//!
//! Rows may be shorter than the header; missing and blank cells read as
//! `None`, the same as an explicit empty field. Rows longer than the header
//! are rejected.

use std::io::Cursor;

use csv::{ErrorKind, ReaderBuilder};

use crate::error::AppError;
use crate::validation::csv_validator::UTF8_BOM;

/// A parsed upload: header names plus data rows in file order.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one column.
#[derive(Debug, Clone)]
pub struct Column<'a> {
    pub index: usize,
    pub name: &'a str,
    /// One entry per row; `None` for blank or missing cells.
    pub values: Vec<Option<&'a str>>,
}

impl<'a> Column<'a> {
    /// Iterates over the non-null values.
    pub fn present(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.values.iter().filter_map(|v| *v)
    }
}

impl Table {
    /// Builds a table directly from headers and rows.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Parses CSV bytes, using the first record as the header row.
    ///
    /// # Errors
    ///
    /// - `AppError::NotUtf8` if a field is not valid UTF-8
    /// - `AppError::EmptyInput` if there is no header or no data row
    /// - `AppError::CsvInvalid` for rows longer than the header and other
    ///   parse failures
    pub fn from_csv_bytes(data: &[u8], source_index: usize) -> Result<Self, AppError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(Cursor::new(data));

        let map_err = |e: csv::Error| match e.kind() {
            ErrorKind::Utf8 { .. } => AppError::NotUtf8 { source_index },
            _ => AppError::CsvInvalid(format!("source {}: {}", source_index + 1, e)),
        };

        let headers: Vec<String> = reader
            .headers()
            .map_err(map_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.is_empty() {
            return Err(AppError::EmptyInput { source_index });
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(map_err)?;
            if record.len() > headers.len() {
                return Err(AppError::CsvInvalid(format!(
                    "source {}: row {} has {} columns, expected {}",
                    source_index + 1,
                    rows.len() + 2,
                    record.len(),
                    headers.len()
                )));
            }
            rows.push(record.iter().map(String::from).collect());
        }

        if rows.is_empty() {
            return Err(AppError::EmptyInput { source_index });
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns: the header width, or the widest row if longer.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }

    /// Returns the column at `index`, or `None` past the last column.
    pub fn column(&self, index: usize) -> Option<Column<'_>> {
        if index >= self.column_count() {
            return None;
        }

        let name = self.headers.get(index).map(String::as_str).unwrap_or("");
        let values = self
            .rows
            .iter()
            .map(|row| {
                row.get(index)
                    .map(String::as_str)
                    .filter(|cell| !cell.trim().is_empty())
            })
            .collect();

        Some(Column {
            index,
            name,
            values,
        })
    }

    /// Iterates over all columns in header order.
    pub fn columns(&self) -> impl Iterator<Item = Column<'_>> + '_ {
        (0..self.column_count()).filter_map(move |i| self.column(i))
    }
}

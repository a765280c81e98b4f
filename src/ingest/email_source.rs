//! Extraction of an ordered email list from a parsed table.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::column_detector::ColumnDetector;
use crate::ingest::table::Table;

/// How the email column is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ColumnSelection {
    /// Use the column detector.
    #[default]
    Detect,
    /// Always take the column at this 0-based position. `index: 1` is the
    /// "second column" behaviour of older exports.
    Fixed { index: usize },
}

/// What to do with rows whose email cell is blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCellPolicy {
    /// Keep the row as an empty-string record.
    #[default]
    Keep,
    /// Drop the row.
    Drop,
}

/// Resolves `selection` to a column index.
///
/// Empty tables are rejected in both modes.
pub fn select_column(
    table: &Table,
    source_index: usize,
    selection: ColumnSelection,
    detector: &ColumnDetector,
) -> Result<usize, AppError> {
    if table.is_empty() {
        return Err(AppError::EmptyInput { source_index });
    }

    match selection {
        ColumnSelection::Detect => detector.detect(table, source_index),
        ColumnSelection::Fixed { index } => Ok(index),
    }
}

/// Ordered email addresses taken from one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSource {
    records: Vec<String>,
}

impl EmailSource {
    pub fn new(records: Vec<String>) -> Self {
        Self { records }
    }

    /// Selects the email column of `table` and copies it out in row order.
    ///
    /// Values are trimmed. Blank cells become `""` or are dropped per
    /// `empty_cells`.
    pub fn from_table(
        table: &Table,
        source_index: usize,
        selection: ColumnSelection,
        detector: &ColumnDetector,
        empty_cells: EmptyCellPolicy,
    ) -> Result<Self, AppError> {
        let index = select_column(table, source_index, selection, detector)?;
        Self::from_column(table, source_index, index, empty_cells)
    }

    /// Copies out the column at `index`.
    pub fn from_column(
        table: &Table,
        source_index: usize,
        index: usize,
        empty_cells: EmptyCellPolicy,
    ) -> Result<Self, AppError> {
        let column = table
            .column(index)
            .ok_or_else(|| AppError::ColumnOutOfRange {
                source_index,
                index,
                columns: table.column_count(),
            })?;

        let records = column
            .values
            .iter()
            .filter_map(|value| match (value, empty_cells) {
                (Some(v), _) => Some(v.trim().to_string()),
                (None, EmptyCellPolicy::Keep) => Some(String::new()),
                (None, EmptyCellPolicy::Drop) => None,
            })
            .collect();

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn into_records(self) -> Vec<String> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.records.iter()
    }
}

impl From<Vec<String>> for EmailSource {
    fn from(records: Vec<String>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<String> for EmailSource {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EmailSource {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

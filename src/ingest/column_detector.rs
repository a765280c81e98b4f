//! Finds the column of a table that holds email addresses.
//!
//! Detection is split into a [`ColumnClassifier`], which scores a single
//! column in `[0, 1]`, and the [`ColumnDetector`], which returns the first
//! column whose score is strictly above its threshold.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ingest::table::{Column, Table};

/// `local-part@domain.tld`: word, dot, hyphen or plus characters before the
/// `@`, dot-separated labels after it, and an alphabetic TLD of 2+ chars.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.+-]+@(?:[\w-]+\.)+[A-Za-z]{2,}$").expect("email pattern is valid")
});

/// Header names treated as email columns by [`HeaderNameClassifier`].
const EMAIL_HEADER_NAMES: &[&str] = &[
    "email",
    "e-mail",
    "mail",
    "email address",
    "email_address",
    "emailaddress",
];

/// Returns true if `value` has the shape of an email address.
pub fn looks_like_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value.trim())
}

/// Scores how likely a column is to contain email addresses.
pub trait ColumnClassifier: Send + Sync {
    /// Returns a score in `[0, 1]`.
    fn score(&self, column: &Column<'_>) -> f64;
}

/// Fraction of non-null values shaped like an email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailShapeClassifier;

impl ColumnClassifier for EmailShapeClassifier {
    fn score(&self, column: &Column<'_>) -> f64 {
        let mut present = 0usize;
        let mut matching = 0usize;
        for value in column.present() {
            present += 1;
            if looks_like_email(value) {
                matching += 1;
            }
        }

        if present == 0 {
            0.0
        } else {
            matching as f64 / present as f64
        }
    }
}

/// Matches well-known header names, ignoring the values.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderNameClassifier;

impl ColumnClassifier for HeaderNameClassifier {
    fn score(&self, column: &Column<'_>) -> f64 {
        let name = column.name.trim().to_lowercase();
        if EMAIL_HEADER_NAMES.contains(&name.as_str()) {
            1.0
        } else {
            0.0
        }
    }
}

/// Named detection strategies, for configuration files and flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    #[default]
    EmailShape,
    HeaderName,
}

impl DetectionStrategy {
    pub fn classifier(self) -> Box<dyn ColumnClassifier> {
        match self {
            DetectionStrategy::EmailShape => Box::new(EmailShapeClassifier),
            DetectionStrategy::HeaderName => Box::new(HeaderNameClassifier),
        }
    }
}

/// Default score a column must exceed.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.5;

/// Picks the email column of a table.
pub struct ColumnDetector {
    classifier: Box<dyn ColumnClassifier>,
    threshold: f64,
}

impl Default for ColumnDetector {
    fn default() -> Self {
        Self::new(Box::new(EmailShapeClassifier))
    }
}

impl ColumnDetector {
    pub fn new(classifier: Box<dyn ColumnClassifier>) -> Self {
        Self {
            classifier,
            threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the index of the first column scoring above the threshold.
    ///
    /// Ties go to the leftmost column.
    ///
    /// # Errors
    ///
    /// - `AppError::EmptyInput` if the table has no rows
    /// - `AppError::NoEmailColumnFound` if no column qualifies
    pub fn detect(&self, table: &Table, source_index: usize) -> Result<usize, AppError> {
        if table.is_empty() {
            return Err(AppError::EmptyInput { source_index });
        }

        table
            .columns()
            .find(|column| self.classifier.score(column) > self.threshold)
            .map(|column| column.index)
            .ok_or(AppError::NoEmailColumnFound { source_index })
    }
}

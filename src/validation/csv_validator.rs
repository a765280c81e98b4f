//! Pre-flight checks for uploaded CSV buffers.
//!
//! Uploads are held in memory, so validation works on byte slices. Only the
//! first `VALIDATION_SAMPLE_SIZE` bytes are inspected; the full parse happens
//! later when the table is loaded. Catches:
//! - empty uploads and UTF-8 encoding errors
//! - missing headers
//! - rows with more fields than the header
//! - short rows, mixed line endings and a leading BOM (warnings only)

use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Number of bytes inspected during validation (512 KB).
pub const VALIDATION_SAMPLE_SIZE: usize = 512 * 1024;

/// Maximum number of records checked in the sample.
const MAX_RECORDS_TO_VALIDATE: usize = 1000;

/// Upload size above which a warning is attached (50 MB).
const LARGE_UPLOAD_THRESHOLD: u64 = 50 * 1024 * 1024;

/// UTF-8 BOM bytes.
pub(crate) const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of validating one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvValidationResult {
    /// Whether the upload passed validation (no errors).
    pub ok: bool,
    pub errors: Vec<CsvValidationError>,
    pub warnings: Vec<CsvValidationWarning>,
    pub stats: CsvValidationStats,
}

/// Statistics collected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvValidationStats {
    pub size_bytes: u64,
    /// Bytes actually inspected (sample size or upload size if smaller).
    pub sample_bytes: u64,
    pub headers: Vec<String>,
    /// Data rows seen in the sample.
    pub sampled_rows: u64,
    pub line_endings: LineEndings,
}

/// Detected line ending style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEndings {
    LF,
    CRLF,
    Mixed,
    #[default]
    Unknown,
}

/// Problems that make the upload unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationError {
    NotUtf8,
    EmptyFile,
    NoHeaders,
    /// No data rows after the header.
    NoDataRows,
    /// A row with more fields than the header.
    InconsistentColumns {
        expected: usize,
        found: usize,
        /// 1-based row number, header included.
        row: u64,
    },
    CsvParseError { message: String },
}

/// Issues worth logging that do not block processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CsvValidationWarning {
    HasBom,
    MixedLineEndings,
    LargeUpload { size_bytes: u64 },
    SampleOnlyValidation { validated_rows: u64 },
    /// Rows with fewer fields than the header; their missing cells read as
    /// blank.
    ShortRows { first_row: u64, count: u64 },
}

impl CsvValidationResult {
    fn failed(
        error: CsvValidationError,
        warnings: Vec<CsvValidationWarning>,
        stats: CsvValidationStats,
    ) -> Self {
        Self {
            ok: false,
            errors: vec![error],
            warnings,
            stats,
        }
    }

    /// Maps the first validation error onto the application error taxonomy.
    pub fn into_result(self, source_index: usize) -> Result<Self, AppError> {
        match self.errors.first() {
            None => Ok(self),
            Some(CsvValidationError::NotUtf8) => Err(AppError::NotUtf8 { source_index }),
            Some(CsvValidationError::EmptyFile) | Some(CsvValidationError::NoDataRows) => {
                Err(AppError::EmptyInput { source_index })
            }
            Some(_) => {
                let messages: Vec<String> = self.errors.iter().map(describe_error).collect();
                Err(AppError::CsvInvalid(format!(
                    "source {}: {}",
                    source_index + 1,
                    messages.join("; ")
                )))
            }
        }
    }
}

fn describe_error(err: &CsvValidationError) -> String {
    match err {
        CsvValidationError::NotUtf8 => "not UTF-8".into(),
        CsvValidationError::EmptyFile => "file is empty".into(),
        CsvValidationError::NoHeaders => "missing header row".into(),
        CsvValidationError::NoDataRows => "no data rows".into(),
        CsvValidationError::InconsistentColumns {
            expected,
            found,
            row,
        } => format!("row {} has {} columns, expected {}", row, found, expected),
        CsvValidationError::CsvParseError { message } => message.clone(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Validates an uploaded CSV buffer.
///
/// Never fails outright: every problem is reported in the returned
/// `CsvValidationResult`. Use [`CsvValidationResult::into_result`] to turn the
/// outcome into an `AppError`.
pub fn validate_bytes(upload: &[u8]) -> CsvValidationResult {
    let mut warnings = Vec::new();
    let size_bytes = upload.len() as u64;

    let mut stats = CsvValidationStats {
        size_bytes,
        ..Default::default()
    };

    if upload.is_empty() {
        return CsvValidationResult::failed(CsvValidationError::EmptyFile, warnings, stats);
    }

    if size_bytes > LARGE_UPLOAD_THRESHOLD {
        warnings.push(CsvValidationWarning::LargeUpload { size_bytes });
    }

    let is_sample_only = upload.len() > VALIDATION_SAMPLE_SIZE;
    let sample = &upload[..upload.len().min(VALIDATION_SAMPLE_SIZE)];
    stats.sample_bytes = sample.len() as u64;

    let has_bom = sample.starts_with(UTF8_BOM);
    if has_bom {
        warnings.push(CsvValidationWarning::HasBom);
    }
    let data = if has_bom {
        &sample[UTF8_BOM.len()..]
    } else {
        sample
    };

    if let Err(e) = std::str::from_utf8(data) {
        // A multi-byte character cut by the sample boundary is not an error.
        let truncated_char = is_sample_only && e.error_len().is_none();
        if !truncated_char {
            return CsvValidationResult::failed(CsvValidationError::NotUtf8, warnings, stats);
        }
    }

    stats.line_endings = detect_line_endings(data);
    if stats.line_endings == LineEndings::Mixed {
        warnings.push(CsvValidationWarning::MixedLineEndings);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(Cursor::new(data));

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(String::from).collect(),
        Err(e) => {
            return CsvValidationResult::failed(
                CsvValidationError::CsvParseError {
                    message: e.to_string(),
                },
                warnings,
                stats,
            );
        }
    };

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return CsvValidationResult::failed(CsvValidationError::NoHeaders, warnings, stats);
    }

    let expected = headers.len();
    stats.headers = headers;

    let mut errors = Vec::new();
    let mut short_rows: Vec<u64> = Vec::new();
    let mut validated_rows: u64 = 0;

    for result in reader.records().take(MAX_RECORDS_TO_VALIDATE) {
        match result {
            Ok(record) => {
                validated_rows += 1;
                if record.len() > expected {
                    errors.push(CsvValidationError::InconsistentColumns {
                        expected,
                        found: record.len(),
                        row: validated_rows + 1,
                    });
                } else if record.len() < expected {
                    short_rows.push(validated_rows + 1);
                }
            }
            Err(e) => {
                if is_sample_only && is_likely_truncation_error(&e) {
                    break;
                }
                errors.push(CsvValidationError::CsvParseError {
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    // A trailing partial row cut by the sample boundary shows up as a short
    // record; only the last one can be affected.
    if is_sample_only {
        if short_rows.last() == Some(&(validated_rows + 1)) {
            short_rows.pop();
        }
        warnings.push(CsvValidationWarning::SampleOnlyValidation { validated_rows });
    }

    if let Some(&first_row) = short_rows.first() {
        warnings.push(CsvValidationWarning::ShortRows {
            first_row,
            count: short_rows.len() as u64,
        });
    }

    stats.sampled_rows = validated_rows;

    if validated_rows == 0 && errors.is_empty() {
        errors.push(CsvValidationError::NoDataRows);
    }

    CsvValidationResult {
        ok: errors.is_empty(),
        errors,
        warnings,
        stats,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Detects line ending style in the given bytes.
fn detect_line_endings(data: &[u8]) -> LineEndings {
    let mut has_lf = false;
    let mut has_crlf = false;

    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            if i > 0 && data[i - 1] == b'\r' {
                has_crlf = true;
            } else {
                has_lf = true;
            }
        }
    }

    match (has_lf, has_crlf) {
        (true, true) => LineEndings::Mixed,
        (true, false) => LineEndings::LF,
        (false, true) => LineEndings::CRLF,
        (false, false) => LineEndings::Unknown,
    }
}

fn is_likely_truncation_error(err: &csv::Error) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("unexpected eof")
        || msg.contains("record ends in a quote")
        || msg.contains("premature eof")
        || msg.contains("utf-8")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

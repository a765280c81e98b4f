//! Input validation for uploads and form fields.
//!
//! CSV checks run on in-memory buffers and only inspect a fixed-size sample,
//! so they stay cheap for large uploads.

pub mod csv_validator;
pub mod form_fields;

pub use csv_validator::{
    validate_bytes, CsvValidationError, CsvValidationResult, CsvValidationStats,
    CsvValidationWarning, LineEndings, VALIDATION_SAMPLE_SIZE,
};
pub use form_fields::{parse_keywords, parse_percentage, parse_percentages, parse_quota_plan};

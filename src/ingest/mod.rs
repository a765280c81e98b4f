//! Loading uploads and pulling the email column out of them.

mod column_detector;
mod email_source;
mod table;

pub use column_detector::{
    looks_like_email, ColumnClassifier, ColumnDetector, DetectionStrategy, EmailShapeClassifier,
    HeaderNameClassifier, DEFAULT_DETECTION_THRESHOLD,
};
pub use email_source::{select_column, ColumnSelection, EmailSource, EmptyCellPolicy};
pub use table::{Column, Table};

use serde::Serialize;
use thiserror::Error;

/// User-friendly error presentation for whatever front end drives the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Application-wide error type.
///
/// Source indexes are 0-based internally and reported 1-based in messages.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Input tables ─────────────────────────────────────────────────────────
    #[error("Source {} has no data rows", .source_index + 1)]
    EmptyInput { source_index: usize },

    #[error("Source {} has no column that looks like email addresses", .source_index + 1)]
    NoEmailColumnFound { source_index: usize },

    #[error(
        "Source {} has {columns} column(s); column {} does not exist",
        .source_index + 1,
        .index + 1
    )]
    ColumnOutOfRange {
        source_index: usize,
        index: usize,
        columns: usize,
    },

    #[error("Source {} is not valid UTF-8", .source_index + 1)]
    NotUtf8 { source_index: usize },

    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    // ── Form fields ──────────────────────────────────────────────────────────
    #[error("Quota plan line {line} is not a non-negative integer: {value:?}")]
    InvalidQuotaEntry { line: usize, value: String },

    #[error("Invalid percentage: {value:?}")]
    InvalidPercentage { value: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Allocation ───────────────────────────────────────────────────────────
    #[error("Day {day} requested {requested} emails but only {delivered} were available")]
    InsufficientRecords {
        day: usize,
        requested: u64,
        delivered: u64,
    },

    // ── Output / config ──────────────────────────────────────────────────────
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // ── Generic fallback ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts the error into a presentation suitable for showing to the
    /// person who submitted the form.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            AppError::EmptyInput { .. } => ErrorPresentation {
                title: "Empty File".into(),
                message: format!("{}.", self),
                action: Some("Upload a CSV file that contains data rows".into()),
            },

            AppError::NoEmailColumnFound { .. } => ErrorPresentation {
                title: "No Email Column".into(),
                message: format!(
                    "{}. More than half of a column's values must be email addresses.",
                    self
                ),
                action: Some("Check that the file contains an email column".into()),
            },

            AppError::ColumnOutOfRange { .. } => ErrorPresentation {
                title: "Missing Column".into(),
                message: format!("{}.", self),
                action: Some("Choose another column or enable column detection".into()),
            },

            AppError::NotUtf8 { .. } => ErrorPresentation {
                title: "Invalid File Encoding".into(),
                message: format!("{}. Please re-save your file with UTF-8 encoding.", self),
                action: Some("Convert file to UTF-8".into()),
            },

            AppError::CsvInvalid(msg) => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: format!("The CSV file has a formatting problem: {}", msg),
                action: Some("Fix the CSV file and try again".into()),
            },

            AppError::InvalidQuotaEntry { .. } => ErrorPresentation {
                title: "Invalid Daily Plan".into(),
                message: format!("{}.", self),
                action: Some("Enter one whole number per line".into()),
            },

            AppError::InvalidPercentage { .. } => ErrorPresentation {
                title: "Invalid Percentage".into(),
                message: format!("{}. Percentages must be numbers of 0 or more.", self),
                action: Some("Correct the percentage fields".into()),
            },

            AppError::InvalidRequest(msg) => ErrorPresentation {
                title: "Invalid Request".into(),
                message: msg.clone(),
                action: None,
            },

            AppError::InsufficientRecords { .. } => ErrorPresentation {
                title: "Not Enough Emails".into(),
                message: format!("{}.", self),
                action: Some("Lower the daily plan or upload more emails".into()),
            },

            AppError::Archive(_) => ErrorPresentation {
                title: "Export Failed".into(),
                message: "The result files could not be written.".into(),
                action: Some("Try again".into()),
            },

            AppError::Config(msg) => ErrorPresentation {
                title: "Configuration Error".into(),
                message: msg.clone(),
                action: Some("Fix the configuration file".into()),
            },

            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }

    /// True for errors caused by the submitted data rather than the system.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            AppError::Archive(_) | AppError::Config(_) | AppError::Internal(_)
        )
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_presentation().serialize(serializer)
    }
}

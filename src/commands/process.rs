//! Upload processing command.
//!
//! Takes what a form submission carries (one or two CSV uploads, the daily
//! plan text, percentage fields, keywords), runs the allocation engine on a
//! blocking thread, and returns a zip with one CSV per day. Each call works
//! on its own in-memory buffers and is tagged with a fresh request id.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocation::{AllocationSummary, DailyBatch};
use crate::archive::ArchiveWriter;
use crate::config::{AppConfig, BlendMode};
use crate::engine::{allocate_batches, AllocationRequest, SourceStats, MAX_SOURCES};
use crate::error::AppError;
use crate::ingest::Table;
use crate::validation::{
    parse_keywords, parse_percentages, parse_quota_plan, validate_bytes, CsvValidationWarning,
};

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// One uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Client-side file name, for logging only.
    pub name: String,
    pub data: Vec<u8>,
}

/// A form submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessEmailsRequest {
    /// One or two uploads, primary first.
    pub files: Vec<UploadedFile>,
    /// Newline-separated daily counts.
    pub daily_plan: String,
    /// Raw percentage fields; blank fields are ignored.
    #[serde(default)]
    pub percentages: Vec<String>,
    /// Comma- or newline-separated exclusion keywords.
    #[serde(default)]
    pub keywords: Option<String>,
    /// Overrides the configured blend mode.
    #[serde(default)]
    pub mode: Option<BlendMode>,
}

/// Per-day delivery figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayReport {
    pub day: usize,
    pub entry: String,
    pub requested: u64,
    pub delivered: u64,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessEmailsResponse {
    pub request_id: String,
    /// Suggested download name, `{base}.zip`.
    pub download_name: String,
    /// Zip bytes.
    pub archive: Vec<u8>,
    pub days: Vec<DayReport>,
    /// The batches packed into `archive`, for callers that render or store
    /// them individually.
    pub batches: Vec<DailyBatch>,
    pub summary: AllocationSummary,
    pub sources: Vec<SourceStats>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Command
// ─────────────────────────────────────────────────────────────────────────────

/// Validates a submission, allocates batches and builds the archive.
///
/// Nothing is produced unless every input is valid: form fields and uploads
/// are checked before the engine runs, and the archive is only assembled
/// after allocation succeeds.
pub async fn process_emails(
    request: ProcessEmailsRequest,
    config: &AppConfig,
) -> Result<ProcessEmailsResponse, AppError> {
    let request_id = Uuid::new_v4().to_string();
    let short_id = &request_id[..8];

    info!(
        request_id = %request_id,
        files = request.files.len(),
        "[PROCESS] Received submission"
    );

    match run(request, config, &request_id).await {
        Ok(response) => Ok(response),
        Err(e) => {
            if e.is_user_error() {
                info!("[PROCESS] Request {} rejected: {}", short_id, e);
            } else {
                warn!("[PROCESS] Request {} failed: {}", short_id, e);
            }
            Err(e)
        }
    }
}

async fn run(
    request: ProcessEmailsRequest,
    config: &AppConfig,
    request_id: &str,
) -> Result<ProcessEmailsResponse, AppError> {
    if request.files.is_empty() || request.files.len() > MAX_SOURCES {
        return Err(AppError::InvalidRequest(format!(
            "Upload 1 or {} CSV files (got {})",
            MAX_SOURCES,
            request.files.len()
        )));
    }

    // Step 1: form fields
    let plan = parse_quota_plan(&request.daily_plan)?;
    let percentages = parse_percentages(request.percentages.iter().map(String::as_str))?;
    let keywords = request
        .keywords
        .as_deref()
        .map(parse_keywords)
        .unwrap_or_default();

    debug!(
        request_id,
        days = plan.len(),
        requested = plan.total(),
        keywords = keywords.terms().len(),
        "[PROCESS] Parsed form fields"
    );

    // Step 2: uploads
    for (source_index, file) in request.files.iter().enumerate() {
        let validation = validate_bytes(&file.data).into_result(source_index)?;
        for warning in &validation.warnings {
            log_warning(request_id, &file.name, warning);
        }
        debug!(
            request_id,
            file = %file.name,
            bytes = validation.stats.size_bytes,
            sampled_rows = validation.stats.sampled_rows,
            "[PROCESS] Upload validated"
        );
    }

    let mut engine_config = config.engine.clone();
    if let Some(mode) = request.mode {
        engine_config.blend_mode = mode;
    }
    let base_name = config.archive_base_name.clone();
    let files = request.files;

    // Step 3: parse, allocate and package off the async runtime
    let (allocation, archive, entries) = tokio::task::spawn_blocking(move || {
        let sources = files
            .iter()
            .enumerate()
            .map(|(i, f)| Table::from_csv_bytes(&f.data, i))
            .collect::<Result<Vec<_>, _>>()?;

        let allocation = allocate_batches(
            AllocationRequest {
                sources,
                percentages,
                plan,
                keywords,
            },
            &engine_config,
        )?;

        let mut writer = ArchiveWriter::new(base_name);
        writer.write_batches(&allocation.batches)?;
        let entries = writer.entries().to_vec();
        let archive = writer.finish()?;

        Ok::<_, AppError>((allocation, archive, entries))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let summary = allocation.summary.clone();
    info!(
        request_id,
        days = summary.days,
        requested = summary.requested,
        delivered = summary.delivered,
        pool = allocation.pool_size,
        archive_bytes = archive.len(),
        "[PROCESS] Allocation complete"
    );

    if let Some(day) = summary.first_short_day() {
        warn!(
            request_id,
            first_short_day = day,
            shortfall = summary.shortfall(),
            "[PROCESS] Not enough emails for the plan; later days are short or empty"
        );
    }

    let days = allocation
        .batches
        .iter()
        .zip(entries)
        .map(|(batch, entry)| DayReport {
            day: batch.day,
            entry,
            requested: batch.requested,
            delivered: batch.delivered(),
        })
        .collect();

    Ok(ProcessEmailsResponse {
        request_id: request_id.to_string(),
        download_name: format!("{}.zip", config.archive_base_name),
        archive,
        days,
        batches: allocation.batches,
        summary,
        sources: allocation.sources,
    })
}

fn log_warning(request_id: &str, file: &str, warning: &CsvValidationWarning) {
    match warning {
        CsvValidationWarning::LargeUpload { size_bytes } => warn!(
            request_id,
            file, size_bytes, "[PROCESS] Large upload; processing may be slow"
        ),
        other => debug!(request_id, file, warning = ?other, "[PROCESS] Upload warning"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn upload(name: &str, csv: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            data: csv.as_bytes().to_vec(),
        }
    }

    fn sample_upload() -> UploadedFile {
        upload("list.csv", "id,mail\n1,a@x.com\n2,b@x.com\n3,c@y.com\n")
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Failed to open archive");
        let mut entry = archive.by_name(name).expect("Missing entry");
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .expect("Failed to read entry");
        content
    }

    #[tokio::test]
    async fn test_end_to_end_archive() {
        let request = ProcessEmailsRequest {
            files: vec![sample_upload()],
            daily_plan: "2\n\n1\n".into(),
            ..Default::default()
        };

        let response = process_emails(request, &AppConfig::default())
            .await
            .expect("process_emails failed");

        assert_eq!(response.download_name, "emails.zip");
        assert_eq!(response.days.len(), 2);
        assert_eq!(response.days[0].entry, "emails_day_1.csv");
        assert_eq!(
            read_entry(&response.archive, "emails_day_1.csv"),
            "email\na@x.com\nb@x.com\n"
        );
        assert_eq!(
            read_entry(&response.archive, "emails_day_2.csv"),
            "email\nc@y.com\n"
        );
        assert!(response.summary.is_complete());
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_keyword_filter_leaves_empty_day() {
        let request = ProcessEmailsRequest {
            files: vec![sample_upload()],
            daily_plan: "2\n1".into(),
            keywords: Some("y.com".into()),
            ..Default::default()
        };

        let response = process_emails(request, &AppConfig::default())
            .await
            .expect("process_emails failed");

        assert_eq!(response.days[0].delivered, 2);
        assert_eq!(response.days[1].delivered, 0);
        assert_eq!(read_entry(&response.archive, "emails_day_2.csv"), "email\n");
        assert_eq!(response.summary.short_days, vec![2]);
    }

    #[tokio::test]
    async fn test_custom_base_name() {
        let config = AppConfig {
            archive_base_name: "campaign".into(),
            ..Default::default()
        };
        let request = ProcessEmailsRequest {
            files: vec![sample_upload()],
            daily_plan: "1".into(),
            ..Default::default()
        };

        let response = process_emails(request, &config).await.unwrap();
        assert_eq!(response.download_name, "campaign.zip");
        assert_eq!(response.days[0].entry, "campaign_day_1.csv");
    }

    #[tokio::test]
    async fn test_ratio_mode_override() {
        let mut primary = String::from("email\n");
        let mut secondary = String::from("email\n");
        for i in 0..5 {
            primary.push_str(&format!("p{}@x.com\n", i));
        }
        for i in 0..20 {
            secondary.push_str(&format!("s{}@y.com\n", i));
        }

        let request = ProcessEmailsRequest {
            files: vec![upload("a.csv", &primary), upload("b.csv", &secondary)],
            daily_plan: "10\n10".into(),
            percentages: vec!["70".into(), "30".into()],
            mode: Some(BlendMode::Ratio),
            ..Default::default()
        };

        let response = process_emails(request, &AppConfig::default()).await.unwrap();
        let delivered: Vec<u64> = response.days.iter().map(|d| d.delivered).collect();
        assert_eq!(delivered, vec![8, 3]);
    }

    #[tokio::test]
    async fn test_invalid_plan_fails_before_processing() {
        let request = ProcessEmailsRequest {
            files: vec![upload("bad.csv", "")],
            daily_plan: "5\nfive".into(),
            ..Default::default()
        };

        // The plan error wins even though the upload is also bad.
        let err = process_emails(request, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidQuotaEntry { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_short_row_becomes_empty_record() {
        let request = ProcessEmailsRequest {
            files: vec![upload("short.csv", "id,mail\n1,a@x.com\n2\n3,c@y.com\n")],
            daily_plan: "5".into(),
            ..Default::default()
        };

        let response = process_emails(request, &AppConfig::default())
            .await
            .expect("short rows must not be rejected");

        assert_eq!(response.batches[0].records, vec!["a@x.com", "", "c@y.com"]);
        assert_eq!(response.days[0].delivered, 3);
    }

    #[tokio::test]
    async fn test_long_row_is_rejected() {
        let request = ProcessEmailsRequest {
            files: vec![upload("long.csv", "id,mail\n1,a@x.com,extra\n")],
            daily_plan: "1".into(),
            ..Default::default()
        };

        let err = process_emails(request, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CsvInvalid(_)));
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let request = ProcessEmailsRequest {
            files: vec![sample_upload(), upload("empty.csv", "email\n")],
            daily_plan: "1".into(),
            ..Default::default()
        };

        let err = process_emails(request, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyInput { source_index: 1 }));
    }

    #[tokio::test]
    async fn test_no_email_column_is_rejected() {
        let request = ProcessEmailsRequest {
            files: vec![upload("names.csv", "id,name\n1,Ann\n2,Bob\n")],
            daily_plan: "1".into(),
            ..Default::default()
        };

        let err = process_emails(request, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoEmailColumnFound { source_index: 0 }));
    }

    #[tokio::test]
    async fn test_file_count_is_checked() {
        let request = ProcessEmailsRequest {
            files: vec![],
            daily_plan: "1".into(),
            ..Default::default()
        };

        assert!(matches!(
            process_emails(request, &AppConfig::default()).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_strict_mode_produces_no_archive() {
        let mut config = AppConfig::default();
        config.engine.strict = true;
        let request = ProcessEmailsRequest {
            files: vec![sample_upload()],
            daily_plan: "2\n2".into(),
            ..Default::default()
        };

        let err = process_emails(request, &config).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientRecords { day: 2, .. }));
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let config = AppConfig::default();
        let a = ProcessEmailsRequest {
            files: vec![upload("same.csv", "email\na@x.com\n")],
            daily_plan: "1".into(),
            ..Default::default()
        };
        let b = ProcessEmailsRequest {
            files: vec![upload("same.csv", "email\nb@x.com\n")],
            daily_plan: "1".into(),
            ..Default::default()
        };

        let (ra, rb) = tokio::join!(process_emails(a, &config), process_emails(b, &config));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert_ne!(ra.request_id, rb.request_id);
        assert_eq!(read_entry(&ra.archive, "emails_day_1.csv"), "email\na@x.com\n");
        assert_eq!(read_entry(&rb.archive, "emails_day_1.csv"), "email\nb@x.com\n");
    }
}

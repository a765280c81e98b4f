//! Serialization of one day's batch to CSV.

use csv::{Terminator, WriterBuilder};

use crate::error::AppError;

/// Header of every batch file.
pub const EMAIL_HEADER: &str = "email";

/// Entry name for a 1-based day: `{base}_day_{day}.csv`.
pub fn entry_name(base: &str, day: usize) -> String {
    format!("{}_day_{}.csv", base, day)
}

/// Writes a single-column CSV with an `email` header, LF-terminated.
pub fn write_batch_csv(records: &[String]) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::with_capacity((records.len() + 1) * 24);
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut buf);

        writer
            .write_record([EMAIL_HEADER])
            .map_err(|e| AppError::Archive(format!("Failed to write header: {}", e)))?;

        for record in records {
            writer
                .write_record([record])
                .map_err(|e| AppError::Archive(format!("Failed to write record: {}", e)))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::Archive(format!("Failed to flush writer: {}", e)))?;
    }
    Ok(buf)
}

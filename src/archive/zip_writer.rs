//! In-memory zip archive of daily batch files.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::allocation::DailyBatch;
use crate::archive::batch_csv::{entry_name, write_batch_csv};
use crate::error::AppError;

/// Collects one CSV entry per day into a zip held in memory.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    base_name: String,
    entries: Vec<String>,
}

impl ArchiveWriter {
    /// Entries will be named `{base_name}_day_{n}.csv`.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            base_name: base_name.into(),
            entries: Vec::new(),
        }
    }

    /// Adds one day's batch and returns the entry name used.
    pub fn write_batch(&mut self, day: usize, records: &[String]) -> Result<String, AppError> {
        let name = entry_name(&self.base_name, day);
        let body = write_batch_csv(records)?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(name.as_str(), options)
            .map_err(|e| AppError::Archive(format!("Failed to start entry {}: {}", name, e)))?;
        self.zip
            .write_all(&body)
            .map_err(|e| AppError::Archive(format!("Failed to write entry {}: {}", name, e)))?;

        self.entries.push(name.clone());
        Ok(name)
    }

    /// Adds every batch in order.
    pub fn write_batches(&mut self, batches: &[DailyBatch]) -> Result<(), AppError> {
        for batch in batches {
            self.write_batch(batch.day, &batch.records)?;
        }
        Ok(())
    }

    /// Entry names written so far.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Finalizes the archive and returns its bytes.
    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| AppError::Archive(format!("Failed to finalize archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// Builds a complete archive for `batches`.
pub fn build_archive(base_name: &str, batches: &[DailyBatch]) -> Result<Vec<u8>, AppError> {
    let mut writer = ArchiveWriter::new(base_name);
    writer.write_batches(batches)?;
    writer.finish()
}

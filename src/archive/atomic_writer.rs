//! Atomic output files with automatic cleanup on failure.
//!
//! Writes go to a uniquely named temporary file in the destination's
//! directory, which is renamed over the destination on `finish()`. Two runs
//! targeting the same directory never share a temporary file, and a dropped
//! writer leaves nothing behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::allocation::DailyBatch;
use crate::archive::batch_csv::{entry_name, write_batch_csv};
use crate::error::AppError;

/// A file writer that only becomes visible at its final path on `finish()`.
pub struct AtomicFileWriter {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
}

impl AtomicFileWriter {
    /// Creates the temporary file next to `final_path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Archive` if the parent directory cannot be
    /// determined or the temporary file cannot be created.
    pub fn new(final_path: impl AsRef<Path>) -> Result<Self, AppError> {
        let final_path = final_path.as_ref().to_path_buf();

        let parent_dir = match final_path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => {
                return Err(AppError::Archive(format!(
                    "Cannot determine parent directory for: {}",
                    final_path.display()
                )))
            }
        };

        let temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| AppError::Archive(format!("Failed to create temporary file: {}", e)))?;

        Ok(Self {
            writer: BufWriter::new(temp_file),
            final_path,
        })
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| AppError::Archive(format!("Failed to write output: {}", e)))
    }

    /// Flushes and atomically moves the file into place.
    ///
    /// On error the temporary file is removed.
    pub fn finish(self) -> Result<PathBuf, AppError> {
        let named_temp = self
            .writer
            .into_inner()
            .map_err(|e| AppError::Archive(format!("Failed to flush buffer: {}", e.error())))?;

        named_temp.persist(&self.final_path).map_err(|e| {
            AppError::Archive(format!(
                "Failed to persist file to {}: {}",
                self.final_path.display(),
                e.error
            ))
        })?;

        Ok(self.final_path)
    }
}

/// Writes `bytes` to `path` atomically.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<PathBuf, AppError> {
    let mut writer = AtomicFileWriter::new(path)?;
    writer.write_all(bytes)?;
    writer.finish()
}

/// Writes one `{base}_day_{n}.csv` per batch into `dir`, creating it if
/// needed. Returns the written paths in day order.
///
/// If a write fails, files already written by this call are removed.
pub fn write_day_files(
    dir: &Path,
    base_name: &str,
    batches: &[DailyBatch],
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        AppError::Archive(format!(
            "Failed to create output directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    // Serialize everything before touching the directory.
    let bodies = batches
        .iter()
        .map(|b| write_batch_csv(&b.records).map(|body| (b.day, body)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut written = Vec::with_capacity(bodies.len());
    for (day, body) in &bodies {
        match write_file_atomic(&dir.join(entry_name(base_name, *day)), body) {
            Ok(path) => written.push(path),
            Err(e) => {
                remove_written(&written);
                return Err(e);
            }
        }
    }

    Ok(written)
}

fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("[ARCHIVE] Failed to remove {}: {}", path.display(), e);
        }
    }
}

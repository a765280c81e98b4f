//! Output of daily batches: per-day CSV bodies, a zip bundle, and atomic
//! file writes.

mod atomic_writer;
mod batch_csv;
mod zip_writer;

pub use atomic_writer::{write_day_files, write_file_atomic, AtomicFileWriter};
pub use batch_csv::{entry_name, write_batch_csv, EMAIL_HEADER};
pub use zip_writer::{build_archive, ArchiveWriter};

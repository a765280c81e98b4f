pub mod allocation;
pub mod archive;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod selection;
pub mod validation;

pub use commands::{process_emails, ProcessEmailsRequest, ProcessEmailsResponse, UploadedFile};
pub use config::{AppConfig, BlendMode, EngineConfig};
pub use engine::{allocate_batches, Allocation, AllocationRequest};
pub use error::AppError;

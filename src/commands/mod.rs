//! Command handlers.
//!
//! This module contains the operations exposed to whatever front end submits
//! uploads (the bundled CLI, or an HTTP layer).

pub mod process;

pub use process::*;

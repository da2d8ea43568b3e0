//! Core system types and foundations
//!
//! This module contains the building blocks shared by every stage of an
//! import run: identifier types, error handling, configuration and logging.

pub mod types;
pub mod error;
pub mod config;
pub mod logging;

// Re-export commonly used items
pub use types::{EntityTypeId, LocalId, RevisionId, Uuid};
pub use error::{DecodeError, DecodeReason, Error, Result, StorageError, StorageResult};
pub use config::{Config, EntityTypeConfig, ImportConfig, LoggingConfig};
pub use logging::init_logging;

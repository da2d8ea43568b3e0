//! Default Content - dependency-ordered import of bundled content entities
//!
//! Modules ship exported content entities as files, one directory per entity
//! type. Importing a module reads every file, builds a graph of the entities
//! each one embeds, orders it so that dependencies come first, and creates or
//! updates the entities in that order while rewriting references to the ids
//! and revisions assigned in the destination.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;

// Main functional modules
pub mod entity;
pub mod graph;
pub mod import;
pub mod storage;

// Collaborators at the edges of a run
pub mod codec;
pub mod events;
pub mod scanner;
pub mod session;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, Result};
pub use import::{ImportOutcome, Importer};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging from configuration
pub fn init(config: &Config) -> Result<()> {
    if !crate::core::init_logging(&config.logging) {
        tracing::debug!("Global subscriber already installed");
    }

    tracing::info!("Initializing {} v{}", NAME, VERSION);

    Ok(())
}

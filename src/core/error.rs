//! Error types and handling for the default content importer
//!
//! Every condition in this module is fatal for the import run that raised it.
//! Conditions the importer absorbs (unresolved references, dependency cycles,
//! existing entities in skip mode) never become errors.

use crate::core::types::{EntityTypeId, LocalId, Uuid};
use std::path::PathBuf;
use thiserror::Error;

/// Main result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for the persistence layer
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Main error type for the importer
#[derive(Error, Debug)]
pub enum Error {
    /// The same UUID was exported by two files in one run
    #[error("Default content with uuid \"{uuid}\" exists twice: {first:?} {second:?}")]
    DuplicateIdentifier {
        /// The duplicated UUID
        uuid: Uuid,
        /// File that registered the UUID first
        first: PathBuf,
        /// File that repeated it
        second: PathBuf,
    },

    /// A content file could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A persistence call failed for a specific record
    #[error("Persistence error for {entity_type} {uuid}: {source}")]
    Persistence {
        /// Entity type of the offending record
        entity_type: EntityTypeId,
        /// UUID of the offending record
        uuid: Uuid,
        /// Underlying storage failure
        #[source]
        source: StorageError,
    },

    /// Storage failure outside the context of a single record
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A record names an entity type the registry does not know
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(EntityTypeId),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fatal error annotated with the module being imported
    #[error("Import of module '{module}' failed: {source}")]
    Module {
        /// Module whose content was being imported
        module: String,
        /// The error that aborted the run
        #[source]
        source: Box<Error>,
    },
}

/// Decoding failure for a single content file
#[derive(Error, Debug)]
#[error("{path:?}: {reason}")]
pub struct DecodeError {
    /// File being decoded
    pub path: PathBuf,
    /// What was wrong with it
    pub reason: DecodeReason,
}

/// Why a payload could not be decoded
#[derive(Error, Debug)]
pub enum DecodeReason {
    /// The payload is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not a JSON object
    #[error("payload is not an object")]
    NotAnObject,

    /// A required field is missing or has the wrong shape
    #[error("missing or malformed field '{0}'")]
    MissingField(String),

    /// A UUID value could not be parsed
    #[error("invalid uuid '{value}': {source}")]
    InvalidUuid {
        /// Raw value found in the payload
        value: String,
        /// Parser error
        #[source]
        source: uuid::Error,
    },

    /// A `_links` href does not follow the export link convention
    #[error("unrecognised link '{0}'")]
    InvalidLink(String),
}

/// Persistence layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Update of an entity that does not exist
    #[error("{entity_type} {id} not found")]
    NotFound {
        /// Entity type
        entity_type: EntityTypeId,
        /// Missing local id
        id: LocalId,
    },

    /// Create with an explicit id that is already taken
    #[error("{entity_type} {id} already exists")]
    IdCollision {
        /// Entity type
        entity_type: EntityTypeId,
        /// Colliding local id
        id: LocalId,
    },

    /// The storage has no table for the entity type
    #[error("no storage for entity type {0}")]
    UnknownEntityType(EntityTypeId),

    /// Backend specific failure
    #[error("backend failure: {0}")]
    Backend(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error for a file
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<DecodeReason>) -> Self {
        Self::Decode(DecodeError {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Create a persistence error for a record
    pub fn persistence(
        entity_type: impl Into<EntityTypeId>,
        uuid: Uuid,
        source: StorageError,
    ) -> Self {
        Self::Persistence {
            entity_type: entity_type.into(),
            uuid,
            source,
        }
    }

    /// Annotate an error with the module being imported
    pub fn in_module(self, module: impl Into<String>) -> Self {
        match self {
            already @ Self::Module { .. } => already,
            other => Self::Module {
                module: module.into(),
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, skipping module annotations
    pub fn root(&self) -> &Error {
        match self {
            Self::Module { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error is a duplicate UUID in the export set
    pub fn is_duplicate_identifier(&self) -> bool {
        matches!(self.root(), Self::DuplicateIdentifier { .. })
    }

    /// Check if this error originates from the persistence layer
    pub fn is_persistence(&self) -> bool {
        matches!(self.root(), Self::Persistence { .. })
    }

    /// Check if this error is a malformed payload
    pub fn is_decode(&self) -> bool {
        matches!(self.root(), Self::Decode(_))
    }

    /// Check if this error aborted an import run, as opposed to rejecting
    /// the configuration before one started
    pub fn is_fatal_for_run(&self) -> bool {
        !matches!(self.root(), Self::Config(_))
    }
}

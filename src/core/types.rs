//! Identifier types shared across the importer
//!
//! Records and vertices are keyed by their global [`Uuid`]. Persisted entities
//! additionally carry a destination-local numeric id and, for revisionable
//! types, a revision id. Both are reassigned by the destination on create, so
//! they are kept as distinct newtypes to avoid mixing them up.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use uuid::Uuid;

/// Entity type tag selecting the target schema and storage (e.g. `node`)
pub type EntityTypeId = String;

/// Destination-local numeric entity id
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(u64);

/// Revision identifier assigned by the persistence layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(u64);

impl LocalId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Id following this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl RevisionId {
    /// Wrap a raw revision id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Revision id following this one
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for LocalId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<u64> for RevisionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

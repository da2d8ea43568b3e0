//! Parsed content records and the per-run record store

use crate::core::error::{Error, Result};
use crate::core::types::{EntityTypeId, Uuid};
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;

/// A content file's parsed header, held until materialization
#[derive(Clone, Debug)]
pub struct Record {
    /// Global identifier, unique across the run
    pub uuid: Uuid,
    /// Entity type selected by the content directory
    pub entity_type: EntityTypeId,
    /// File the record was read from
    pub path: PathBuf,
    /// Raw file contents, decoded again at materialization time
    pub payload: Bytes,
    /// UUIDs of the entities embedded in the payload, in payload order
    pub embedded: Vec<Uuid>,
    /// Declared weight, used to break ordering ties
    pub weight: Option<i64>,
}

/// Map from UUID to record for a single import run
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<Uuid, Record>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record. A UUID seen before means the export set is corrupt.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if let Some(existing) = self.records.get(&record.uuid) {
            return Err(Error::DuplicateIdentifier {
                uuid: record.uuid,
                first: existing.path.clone(),
                second: record.path,
            });
        }

        self.records.insert(record.uuid, record);
        Ok(())
    }

    /// Remove and return the record for a UUID
    pub fn take(&mut self, uuid: &Uuid) -> Option<Record> {
        self.records.remove(uuid)
    }

    /// Declared weight of a record
    pub fn weight(&self, uuid: &Uuid) -> Option<i64> {
        self.records.get(uuid).and_then(|r| r.weight)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

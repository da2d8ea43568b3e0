//! In-memory entity storage
//!
//! One table per content entity type. Local ids are assigned as `max + 1`,
//! revision ids come from a per-type counter, and every revision records the
//! account that wrote it. Tables can be written to and restored from a JSON
//! snapshot so state survives between command-line runs.

use crate::core::error::{Error, Result, StorageError, StorageResult};
use crate::core::types::{LocalId, RevisionId};
use crate::entity::{Entity, EntityTypeRegistry};
use crate::session::Session;
use crate::storage::{Condition, EntityStorage, SavedIdentity};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

/// A revision written to a table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionLogEntry {
    /// Revision id
    pub revision_id: RevisionId,
    /// Entity the revision belongs to
    pub id: LocalId,
    /// Account that wrote it
    pub author: LocalId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct TypeTable {
    revisionable: bool,
    entities: BTreeMap<LocalId, Entity>,
    last_revision: u64,
    revisions: Vec<RevisionLogEntry>,
}

impl TypeTable {
    fn next_id(&self) -> LocalId {
        self.entities
            .keys()
            .next_back()
            .map_or(LocalId::new(1), |id| id.next())
    }

    fn next_revision(&mut self) -> RevisionId {
        self.last_revision += 1;
        RevisionId::new(self.last_revision)
    }
}

/// Entity storage held in memory
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: DashMap<String, TypeTable>,
}

impl MemoryStorage {
    /// Storage with a table for every content type of `registry`
    pub fn new(registry: &dyn EntityTypeRegistry) -> Self {
        let storage = Self::default();
        for definition in registry.definitions().iter().filter(|d| d.is_content()) {
            storage.tables.insert(
                definition.id.clone(),
                TypeTable {
                    revisionable: definition.is_revisionable(),
                    ..TypeTable::default()
                },
            );
        }
        storage
    }

    /// Storage restored from a snapshot file; types missing from the snapshot
    /// get empty tables
    pub fn restore(registry: &dyn EntityTypeRegistry, path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read(path)?;
        let snapshot: BTreeMap<String, TypeTable> = serde_json::from_slice(&contents)
            .map_err(|e| StorageError::Backend(format!("invalid snapshot: {}", e)))?;

        let storage = Self::new(registry);
        for (entity_type, table) in snapshot {
            storage.tables.insert(entity_type, table);
        }
        Ok(storage)
    }

    /// Write all tables to a snapshot file
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot: BTreeMap<String, TypeTable> = self
            .tables
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| Error::Storage(StorageError::Backend(e.to_string())))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Number of entities of a type
    pub fn count(&self, entity_type: &str) -> usize {
        self.tables.get(entity_type).map_or(0, |t| t.entities.len())
    }

    /// Number of entities across all types
    pub fn total(&self) -> usize {
        self.tables.iter().map(|t| t.entities.len()).sum()
    }

    /// All entities of a type, by ascending local id
    pub fn entities(&self, entity_type: &str) -> Vec<Entity> {
        self.tables
            .get(entity_type)
            .map(|t| t.entities.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Revisions written for a type, oldest first
    pub fn revisions(&self, entity_type: &str) -> Vec<RevisionLogEntry> {
        self.tables
            .get(entity_type)
            .map(|t| t.revisions.clone())
            .unwrap_or_default()
    }
}

impl EntityStorage for MemoryStorage {
    fn query(&self, entity_type: &str, conditions: &[Condition]) -> StorageResult<Option<LocalId>> {
        let table = self
            .tables
            .get(entity_type)
            .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))?;

        Ok(table
            .entities
            .iter()
            .find(|(_, entity)| conditions.iter().all(|c| c.matches(entity)))
            .map(|(id, _)| *id))
    }

    fn load(&self, entity_type: &str, id: LocalId) -> StorageResult<Option<Entity>> {
        let table = self
            .tables
            .get(entity_type)
            .ok_or_else(|| StorageError::UnknownEntityType(entity_type.to_string()))?;

        Ok(table.entities.get(&id).cloned())
    }

    fn save(&self, entity: &mut Entity, session: &Session) -> StorageResult<SavedIdentity> {
        let entity_type = entity.entity_type().to_string();
        let mut table = self
            .tables
            .get_mut(&entity_type)
            .ok_or_else(|| StorageError::UnknownEntityType(entity_type.clone()))?;

        let id = if entity.is_new() {
            match entity.id() {
                Some(id) if table.entities.contains_key(&id) => {
                    return Err(StorageError::IdCollision { entity_type, id });
                }
                Some(id) => id,
                None => table.next_id(),
            }
        } else {
            let id = entity.original_id().or(entity.id()).ok_or_else(|| {
                StorageError::Backend(format!("update of {} without id", entity_type))
            })?;
            if !table.entities.contains_key(&id) {
                return Err(StorageError::NotFound { entity_type, id });
            }
            id
        };

        if table.revisionable {
            if entity.is_new_revision() || entity.revision_id().is_none() {
                let revision_id = table.next_revision();
                table.revisions.push(RevisionLogEntry {
                    revision_id,
                    id,
                    author: session.account().id,
                });
                entity.set_revision_id(Some(revision_id));
            }
        } else {
            entity.set_revision_id(None);
        }

        entity.set_id(Some(id));
        entity.enforce_is_new(false);
        entity.set_new_revision(false);
        table.entities.insert(id, entity.clone());

        trace!(entity_type = %entity_type, %id, uuid = %entity.uuid(), "saved");

        Ok(SavedIdentity {
            id,
            revision_id: entity.revision_id(),
        })
    }
}

//! Persistence layer
//!
//! The importer talks to storage through [`EntityStorage`]: an equality query
//! returning at most one id, a load by id, and a save that reports the ids the
//! backend assigned. [`MemoryStorage`] is the in-process implementation.

pub mod memory;

pub use memory::MemoryStorage;

use crate::core::error::StorageResult;
use crate::core::types::{LocalId, RevisionId, Uuid};
use crate::entity::Entity;
use crate::session::Session;
use std::sync::Arc;

/// Equality condition of a storage query
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Local id equals
    Id(LocalId),
    /// UUID equals
    Uuid(Uuid),
}

impl Condition {
    /// Whether `entity` satisfies the condition
    pub fn matches(&self, entity: &Entity) -> bool {
        match self {
            Condition::Id(id) => entity.id() == Some(*id),
            Condition::Uuid(uuid) => entity.uuid() == *uuid,
        }
    }
}

/// Identity assigned by a successful save
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedIdentity {
    /// Local id of the saved entity
    pub id: LocalId,
    /// Revision id, revisionable types only
    pub revision_id: Option<RevisionId>,
}

/// Per entity type persistence
pub trait EntityStorage {
    /// Id of the first entity of `entity_type` matching every condition
    fn query(
        &self,
        entity_type: &str,
        conditions: &[Condition],
    ) -> StorageResult<Option<LocalId>>;

    /// Load an entity by local id
    fn load(&self, entity_type: &str, id: LocalId) -> StorageResult<Option<Entity>>;

    /// Create or update `entity`, as decided by its `is_new` flag
    fn save(&self, entity: &mut Entity, session: &Session) -> StorageResult<SavedIdentity>;

    /// Load the first entity matching every condition
    fn load_by(
        &self,
        entity_type: &str,
        conditions: &[Condition],
    ) -> StorageResult<Option<Entity>> {
        match self.query(entity_type, conditions)? {
            Some(id) => self.load(entity_type, id),
            None => Ok(None),
        }
    }
}

impl<S: EntityStorage + ?Sized> EntityStorage for Arc<S> {
    fn query(
        &self,
        entity_type: &str,
        conditions: &[Condition],
    ) -> StorageResult<Option<LocalId>> {
        (**self).query(entity_type, conditions)
    }

    fn load(&self, entity_type: &str, id: LocalId) -> StorageResult<Option<Entity>> {
        (**self).load(entity_type, id)
    }

    fn save(&self, entity: &mut Entity, session: &Session) -> StorageResult<SavedIdentity> {
        (**self).save(entity, session)
    }
}

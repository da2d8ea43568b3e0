//! Entity materialization
//!
//! Turns one record into a persisted entity. References are pointed at their
//! destination ids, the entity is matched against what storage already holds,
//! and the create, update or skip decision is taken before saving.

use crate::codec::Decoder;
use crate::core::error::{Error, Result, StorageError};
use crate::core::types::LocalId;
use crate::entity::{Entity, EntityTypeDefinition, EntityTypeRegistry};
use crate::graph::Record;
use crate::import::revision::RevisionLinkTable;
use crate::session::Session;
use crate::storage::{Condition, EntityStorage};
use tracing::debug;

/// Entity type of user accounts
pub const USER_ENTITY_TYPE: &str = "user";

/// The platform's first user; its identity is its id, not its UUID
const FIRST_USER: LocalId = LocalId::new(1);

/// Why a vertex produced no write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Referenced by a record but not exported itself
    Placeholder,
    /// Already in storage and updates are disabled
    Exists,
}

/// Outcome of materializing one vertex
#[derive(Clone, Debug, PartialEq)]
pub enum Disposition {
    /// A new entity was saved
    Created(Entity),
    /// An existing entity was overwritten in place
    Updated(Entity),
    /// Nothing was written
    Skipped(SkipReason),
}

/// Writes records to storage, one vertex at a time
pub struct Materializer<'a, S: EntityStorage + ?Sized> {
    storage: &'a S,
    registry: &'a dyn EntityTypeRegistry,
    decoder: &'a dyn Decoder,
    session: &'a Session,
    update_existing: bool,
}

impl<'a, S: EntityStorage + ?Sized> Materializer<'a, S> {
    /// Materializer writing through `storage` as the session's account
    pub fn new(
        storage: &'a S,
        registry: &'a dyn EntityTypeRegistry,
        decoder: &'a dyn Decoder,
        session: &'a Session,
        update_existing: bool,
    ) -> Self {
        Self {
            storage,
            registry,
            decoder,
            session,
            update_existing,
        }
    }

    /// Materialize the record of one vertex, if it has one
    pub fn materialize(
        &self,
        record: Option<&Record>,
        links: &mut RevisionLinkTable,
    ) -> Result<Disposition> {
        let Some(record) = record else {
            return Ok(Disposition::Skipped(SkipReason::Placeholder));
        };

        let definition = self.registry.require(&record.entity_type)?;
        let mut entity = self.decoder.decode_entity(record, definition)?;
        let fail =
            |source: StorageError| Error::persistence(definition.id.clone(), record.uuid, source);

        self.resolve_references(&mut entity, links).map_err(fail)?;

        let existing = self.lookup(&entity, definition).map_err(fail)?;
        let update = match existing {
            Some(_) if !self.update_existing => {
                debug!(uuid = %record.uuid, entity_type = %definition.id, "exists, skipping");
                return Ok(Disposition::Skipped(SkipReason::Exists));
            }
            Some(old) => {
                entity.set_uuid(old.uuid());
                entity.set_id(old.id());
                if definition.is_revisionable() {
                    entity.set_revision_id(old.revision_id());
                }
                if let Some(id) = old.id() {
                    entity.set_original_id(id);
                }
                true
            }
            None => {
                if let Some(id) = entity.id() {
                    let taken = self.storage.query(&definition.id, &[Condition::Id(id)]);
                    if taken.map_err(fail)?.is_some() {
                        entity.set_id(None);
                    }
                }
                entity.set_revision_id(None);
                entity.enforce_is_new(true);
                false
            }
        };

        if definition.is_revisionable() {
            entity.set_new_revision(entity.is_new());
        }

        if definition.has_owner() && entity.owner().is_none() {
            let owner = embedded_owner(&entity, definition).unwrap_or(self.session.account().id);
            entity.set_owner(Some(owner));
        }

        let saved = self.storage.save(&mut entity, self.session).map_err(fail)?;
        if let (true, Some(revision_id)) = (definition.is_revisionable(), saved.revision_id) {
            links.record(&definition.id, saved.id, revision_id);
        }

        debug!(
            uuid = %record.uuid,
            entity_type = %definition.id,
            id = %saved.id,
            update,
            "materialized"
        );

        Ok(if update {
            Disposition::Updated(entity)
        } else {
            Disposition::Created(entity)
        })
    }

    /// Point references at the destination ids of their targets. Targets that
    /// are not in storage keep the ids they were exported with.
    fn resolve_references(
        &self,
        entity: &mut Entity,
        links: &RevisionLinkTable,
    ) -> std::result::Result<(), StorageError> {
        for reference in entity.references_mut() {
            let (Some(target_uuid), Some(target)) =
                (reference.target_uuid, self.registry.definition(&reference.target_type))
            else {
                continue;
            };
            if !target.is_content() {
                continue;
            }
            let Some(id) = self.storage.query(&target.id, &[Condition::Uuid(target_uuid)])? else {
                continue;
            };

            reference.target_id = Some(id);
            if target.is_revisionable() {
                let revision = match links.lookup(&target.id, id) {
                    Some(revision) => Some(revision),
                    None => self.storage.load(&target.id, id)?.and_then(|e| e.revision_id()),
                };
                if revision.is_some() {
                    reference.target_revision_id = revision;
                }
            }
        }
        Ok(())
    }

    /// Existing entity this one corresponds to
    fn lookup(
        &self,
        entity: &Entity,
        definition: &EntityTypeDefinition,
    ) -> std::result::Result<Option<Entity>, StorageError> {
        let condition = match entity.id() {
            Some(FIRST_USER) if definition.id == USER_ENTITY_TYPE => Condition::Id(FIRST_USER),
            _ => Condition::Uuid(entity.uuid()),
        };
        self.storage.load_by(&definition.id, &[condition])
    }
}

/// Destination id of an owner exported as a reference on the owner field
fn embedded_owner(entity: &Entity, definition: &EntityTypeDefinition) -> Option<LocalId> {
    let key = definition.keys.owner.as_deref()?;
    entity
        .references()
        .iter()
        .find(|reference| reference.field == key)
        .and_then(|reference| reference.target_id)
}

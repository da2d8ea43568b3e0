//! Materialized entity representation
//!
//! An [`Entity`] is what the decoder produces from a record's payload and what
//! the persistence layer stores. The importer only ever touches its identity,
//! ownership and reference fields; everything else rides along in `fields`.

use crate::core::types::{EntityTypeId, LocalId, RevisionId, Uuid};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference from one entity to another
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    /// Field holding the reference
    pub field: String,
    /// Target entity type
    pub target_type: EntityTypeId,
    /// Target UUID, as exported
    pub target_uuid: Option<Uuid>,
    /// Target local id in the destination
    pub target_id: Option<LocalId>,
    /// Target revision id, revisionable targets only
    pub target_revision_id: Option<RevisionId>,
}

impl EntityReference {
    /// Reference to `target_uuid` through `field`
    pub fn new(
        field: impl Into<String>,
        target_type: impl Into<EntityTypeId>,
        target_uuid: Uuid,
    ) -> Self {
        Self {
            field: field.into(),
            target_type: target_type.into(),
            target_uuid: Some(target_uuid),
            target_id: None,
            target_revision_id: None,
        }
    }
}

/// Typed, in-memory entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    entity_type: EntityTypeId,
    uuid: Uuid,
    id: Option<LocalId>,
    revision_id: Option<RevisionId>,
    owner: Option<LocalId>,
    references: Vec<EntityReference>,
    fields: Map<String, Value>,
    #[serde(skip)]
    is_new: bool,
    #[serde(skip)]
    new_revision: bool,
    #[serde(skip)]
    original_id: Option<LocalId>,
}

impl Entity {
    /// New entity of `entity_type` identified by `uuid`
    pub fn new(entity_type: impl Into<EntityTypeId>, uuid: Uuid) -> Self {
        Self {
            entity_type: entity_type.into(),
            uuid,
            id: None,
            revision_id: None,
            owner: None,
            references: Vec::new(),
            fields: Map::new(),
            is_new: true,
            new_revision: false,
            original_id: None,
        }
    }

    /// Builder-style local id
    pub fn with_id(mut self, id: LocalId) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder-style revision id
    pub fn with_revision(mut self, revision_id: RevisionId) -> Self {
        self.revision_id = Some(revision_id);
        self
    }

    /// Builder-style scalar field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Builder-style reference
    pub fn with_reference(mut self, reference: EntityReference) -> Self {
        self.references.push(reference);
        self
    }

    /// Entity type id
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Global identifier
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Replace the global identifier
    pub fn set_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    /// Local id, if assigned
    pub fn id(&self) -> Option<LocalId> {
        self.id
    }

    /// Set or clear the local id
    pub fn set_id(&mut self, id: Option<LocalId>) {
        self.id = id;
    }

    /// Revision id, if assigned
    pub fn revision_id(&self) -> Option<RevisionId> {
        self.revision_id
    }

    /// Set or clear the revision id
    pub fn set_revision_id(&mut self, revision_id: Option<RevisionId>) {
        self.revision_id = revision_id;
    }

    /// Owning account
    pub fn owner(&self) -> Option<LocalId> {
        self.owner
    }

    /// Set or clear the owning account
    pub fn set_owner(&mut self, owner: Option<LocalId>) {
        self.owner = owner;
    }

    /// References to other entities
    pub fn references(&self) -> &[EntityReference] {
        &self.references
    }

    /// Mutable references to other entities
    pub fn references_mut(&mut self) -> &mut [EntityReference] {
        &mut self.references
    }

    /// Scalar fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Single scalar field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Whether the next save creates the entity
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Force create (`true`) or update (`false`) on the next save
    pub fn enforce_is_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// Whether the next save creates a new revision
    pub fn is_new_revision(&self) -> bool {
        self.new_revision
    }

    /// Request (or not) a new revision on the next save
    pub fn set_new_revision(&mut self, new_revision: bool) {
        self.new_revision = new_revision;
    }

    /// Id of the persisted entity this one replaces on update
    pub fn original_id(&self) -> Option<LocalId> {
        self.original_id
    }

    /// Mark this entity as an update of the persisted entity `id`
    pub fn set_original_id(&mut self, id: LocalId) {
        self.original_id = Some(id);
        self.is_new = false;
    }
}

//! Entity type definitions and the registry that enumerates them
//!
//! What an entity type can do (revisions, ownership) is resolved once from
//! configuration into an [`EntityClass`] and carried around as data.

use crate::core::config::EntityTypeConfig;
use crate::core::error::{Error, Result};
use std::collections::HashMap;

/// Optional behaviours of a content entity type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Saves may create revisions, and references to it carry a revision id
    pub revisionable: bool,
    /// Entities have an owning user account
    pub owner: bool,
}

/// Kind of entity type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityClass {
    /// Configuration entity, never imported as content
    Config,
    /// Content entity with its capabilities
    Content(Capabilities),
}

/// Field names of an entity type's unique keys
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityKeys {
    /// Local id field
    pub id: String,
    /// UUID field
    pub uuid: String,
    /// Revision id field
    pub revision: Option<String>,
    /// Owner field
    pub owner: Option<String>,
}

/// A registered entity type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTypeDefinition {
    /// Entity type id
    pub id: String,
    /// Kind and capabilities
    pub class: EntityClass,
    /// Unique key field names
    pub keys: EntityKeys,
}

impl EntityTypeDefinition {
    /// Whether entities of this type are content (importable)
    pub fn is_content(&self) -> bool {
        matches!(self.class, EntityClass::Content(_))
    }

    /// Whether entities of this type are revisionable
    pub fn is_revisionable(&self) -> bool {
        matches!(self.class, EntityClass::Content(c) if c.revisionable)
    }

    /// Whether entities of this type have an owner field
    pub fn has_owner(&self) -> bool {
        matches!(self.class, EntityClass::Content(c) if c.owner)
    }
}

impl From<&EntityTypeConfig> for EntityTypeDefinition {
    fn from(config: &EntityTypeConfig) -> Self {
        let class = if config.config {
            EntityClass::Config
        } else {
            EntityClass::Content(Capabilities {
                revisionable: config.revision_key.is_some(),
                owner: config.owner_key.is_some(),
            })
        };

        Self {
            id: config.id.clone(),
            class,
            keys: EntityKeys {
                id: config.id_key.clone(),
                uuid: config.uuid_key.clone(),
                revision: config.revision_key.clone(),
                owner: config.owner_key.clone(),
            },
        }
    }
}

/// Enumerates the entity types known to the destination
pub trait EntityTypeRegistry {
    /// All definitions, in a stable order
    fn definitions(&self) -> &[EntityTypeDefinition];

    /// Definition for a single entity type
    fn definition(&self, entity_type: &str) -> Option<&EntityTypeDefinition>;

    /// Definition for a single entity type, or an error naming it
    fn require(&self, entity_type: &str) -> Result<&EntityTypeDefinition> {
        self.definition(entity_type)
            .ok_or_else(|| Error::UnknownEntityType(entity_type.to_string()))
    }
}

/// Registry over a fixed list of definitions
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    definitions: Vec<EntityTypeDefinition>,
    index: HashMap<String, usize>,
}

impl StaticRegistry {
    /// Create a registry from definitions; later duplicates replace earlier ones
    pub fn new(definitions: impl IntoIterator<Item = EntityTypeDefinition>) -> Self {
        let mut registry = Self::default();
        for definition in definitions {
            registry.register(definition);
        }
        registry
    }

    /// Create a registry from configuration entries
    pub fn from_config(entries: &[EntityTypeConfig]) -> Self {
        Self::new(entries.iter().map(EntityTypeDefinition::from))
    }

    /// Registry with the standard content model
    pub fn standard() -> Self {
        Self::from_config(&EntityTypeConfig::standard())
    }

    /// Add or replace a definition
    pub fn register(&mut self, definition: EntityTypeDefinition) {
        match self.index.get(&definition.id) {
            Some(&pos) => self.definitions[pos] = definition,
            None => {
                self.index.insert(definition.id.clone(), self.definitions.len());
                self.definitions.push(definition);
            }
        }
    }
}

impl EntityTypeRegistry for StaticRegistry {
    fn definitions(&self) -> &[EntityTypeDefinition] {
        &self.definitions
    }

    fn definition(&self, entity_type: &str) -> Option<&EntityTypeDefinition> {
        self.index.get(entity_type).map(|&pos| &self.definitions[pos])
    }
}

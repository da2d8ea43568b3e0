//! Revision link table

use crate::core::types::{EntityTypeId, LocalId, RevisionId};
use std::collections::HashMap;

/// Revision ids assigned during the current run, by `(entity type, local id)`
#[derive(Debug, Default)]
pub struct RevisionLinkTable {
    links: HashMap<(EntityTypeId, LocalId), RevisionId>,
}

impl RevisionLinkTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the revision produced by the latest save of an entity
    pub fn record(&mut self, entity_type: &str, id: LocalId, revision_id: RevisionId) {
        self.links.insert((entity_type.to_string(), id), revision_id);
    }

    /// Revision produced by this run for an entity, if any
    pub fn lookup(&self, entity_type: &str, id: LocalId) -> Option<RevisionId> {
        self.links.get(&(entity_type.to_string(), id)).copied()
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links were recorded
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

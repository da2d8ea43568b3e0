//! Export format decoding
//!
//! Content files are HAL+JSON documents:
//!
//! ```json
//! {
//!   "_links": { "type": { "href": "http://drupal.org/rest/type/node/article" } },
//!   "uuid":   [ { "value": "6f0c..." } ],
//!   "nid":    [ { "value": 4 } ],
//!   "title":  [ { "value": "Welcome" } ],
//!   "_embedded": {
//!     "http://drupal.org/rest/relation/node/article/field_image": [
//!       { "_links": { "type": { "href": "http://drupal.org/rest/type/file/image" } },
//!         "uuid": [ { "value": "a1b2..." } ] }
//!     ]
//!   }
//! }
//! ```
//!
//! Every embedded item is a reference to another exported entity and becomes a
//! dependency edge of the record.

use crate::core::error::{DecodeReason, Error, Result};
use crate::core::types::{LocalId, RevisionId, Uuid};
use crate::entity::{Entity, EntityReference, EntityTypeDefinition};
use crate::graph::Record;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::path::Path;

const EMBEDDED: &str = "_embedded";
const LINKS: &str = "_links";

/// UUID field of embedded reference stubs, whatever the target type's own key
const STUB_UUID_KEY: &str = "uuid";

/// Turns file bytes into records and typed entities
pub trait Decoder {
    /// Decode just enough of a file to place it in the dependency graph
    fn decode_record(
        &self,
        path: &Path,
        payload: Bytes,
        definition: &EntityTypeDefinition,
    ) -> Result<Record>;

    /// Fully decode a record into an entity of the given type
    fn decode_entity(&self, record: &Record, definition: &EntityTypeDefinition) -> Result<Entity>;
}

/// Decoder for the HAL+JSON export format
#[derive(Clone, Debug)]
pub struct HalJsonDecoder {
    link_domain: String,
}

impl HalJsonDecoder {
    /// Decoder for links rooted at `link_domain` (e.g. `http://drupal.org`)
    pub fn new(link_domain: impl Into<String>) -> Self {
        let mut link_domain = link_domain.into();
        while link_domain.ends_with('/') {
            link_domain.pop();
        }
        Self { link_domain }
    }

    /// Parse `<domain>/rest/type/<entity_type>/<bundle>` into its parts
    pub fn parse_type_link<'a>(&self, href: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = self.strip_domain(href)?.strip_prefix("/rest/type/")?;
        let (entity_type, bundle) = rest.split_once('/')?;
        (!entity_type.is_empty() && !bundle.is_empty() && !bundle.contains('/'))
            .then_some((entity_type, bundle))
    }

    /// Field name of `<domain>/rest/relation/<entity_type>/<bundle>/<field>`
    pub fn parse_relation_link<'a>(&self, href: &'a str) -> Option<&'a str> {
        let rest = self.strip_domain(href)?.strip_prefix("/rest/relation/")?;
        let mut parts = rest.split('/');
        let (_entity_type, _bundle, field) = (parts.next()?, parts.next()?, parts.next()?);
        (parts.next().is_none() && !field.is_empty()).then_some(field)
    }

    fn strip_domain<'a>(&self, href: &'a str) -> Option<&'a str> {
        href.strip_prefix(self.link_domain.as_str())
    }

    fn parse(path: &Path, payload: &[u8]) -> Result<Map<String, Value>> {
        match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Error::decode(path, DecodeReason::NotAnObject)),
            Err(e) => Err(Error::decode(path, e)),
        }
    }

    fn embedded(map: &Map<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
        map.get(EMBEDDED)
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|relations| relations.iter())
            .flat_map(|(relation, items)| {
                items
                    .as_array()
                    .into_iter()
                    .flat_map(|items| items.iter())
                    .map(move |item| (relation, item))
            })
    }
}

impl Default for HalJsonDecoder {
    fn default() -> Self {
        Self::new("http://drupal.org")
    }
}

/// First item's property of a multi-valued field: `field[0].prop`
fn first_item<'a>(map: &'a Map<String, Value>, field: &str, prop: &str) -> Option<&'a Value> {
    map.get(field)?.as_array()?.first()?.get(prop)
}

fn as_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_str()?.parse().ok())
}

fn as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str()?.parse().ok())
}

fn uuid_of(path: &Path, map: &Map<String, Value>, key: &str, context: &str) -> Result<Uuid> {
    let raw = first_item(map, key, "value")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            Error::decode(path, DecodeReason::MissingField(format!("{}{}", context, key)))
        })?;

    Uuid::parse_str(raw).map_err(|source| {
        Error::decode(
            path,
            DecodeReason::InvalidUuid {
                value: raw.to_string(),
                source,
            },
        )
    })
}

impl Decoder for HalJsonDecoder {
    fn decode_record(
        &self,
        path: &Path,
        payload: Bytes,
        definition: &EntityTypeDefinition,
    ) -> Result<Record> {
        let map = Self::parse(path, &payload)?;
        let uuid = uuid_of(path, &map, &definition.keys.uuid, "")?;

        let mut embedded = Vec::new();
        for (relation, item) in Self::embedded(&map) {
            let item = item
                .as_object()
                .ok_or_else(|| Error::decode(path, DecodeReason::MissingField(relation.clone())))?;
            let context = format!("{}[].", relation);
            embedded.push(uuid_of(path, item, STUB_UUID_KEY, &context)?);
        }

        let weight = first_item(&map, "weight", "value").and_then(as_i64);

        Ok(Record {
            uuid,
            entity_type: definition.id.clone(),
            path: path.to_path_buf(),
            payload,
            embedded,
            weight,
        })
    }

    fn decode_entity(&self, record: &Record, definition: &EntityTypeDefinition) -> Result<Entity> {
        let path = record.path.as_path();
        let map = Self::parse(path, &record.payload)?;
        let keys = &definition.keys;

        let mut entity = Entity::new(definition.id.clone(), record.uuid);
        let id = first_item(&map, &keys.id, "value").and_then(as_u64);
        entity.set_id(id.map(LocalId::new));
        if let Some(revision) = &keys.revision {
            let revision_id = first_item(&map, revision, "value").and_then(as_u64);
            entity.set_revision_id(revision_id.map(RevisionId::new));
        }
        // An owner exported only as an embedded reference is resolved at import
        if let Some(owner) = &keys.owner {
            let owner_id = first_item(&map, owner, "target_id").and_then(as_u64);
            entity.set_owner(owner_id.map(LocalId::new));
        }

        for (name, value) in &map {
            let reserved = name.starts_with('_')
                || *name == keys.id
                || *name == keys.uuid
                || keys.revision.as_deref() == Some(name.as_str())
                || keys.owner.as_deref() == Some(name.as_str());
            if !reserved {
                entity = entity.with_field(name.clone(), value.clone());
            }
        }

        for (relation, item) in Self::embedded(&map) {
            let field = self
                .parse_relation_link(relation)
                .ok_or_else(|| Error::decode(path, DecodeReason::InvalidLink(relation.clone())))?;
            let item = item
                .as_object()
                .ok_or_else(|| Error::decode(path, DecodeReason::MissingField(relation.clone())))?;

            let href = item
                .get(LINKS)
                .and_then(|links| links.get("type"))
                .and_then(|link| link.get("href"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    let field = format!("{}[]._links.type", relation);
                    Error::decode(path, DecodeReason::MissingField(field))
                })?;
            let (target_type, _bundle) = self
                .parse_type_link(href)
                .ok_or_else(|| Error::decode(path, DecodeReason::InvalidLink(href.to_string())))?;

            let target_uuid = uuid_of(path, item, STUB_UUID_KEY, "")?;
            let mut reference = EntityReference::new(field, target_type, target_uuid);
            reference.target_revision_id = item
                .get("target_revision_id")
                .and_then(as_u64)
                .map(RevisionId::new);
            entity = entity.with_reference(reference);
        }

        Ok(entity)
    }
}

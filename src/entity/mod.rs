//! Entity types and materialized entities

pub mod definition;
pub mod model;

pub use definition::{
    Capabilities, EntityClass, EntityKeys, EntityTypeDefinition, EntityTypeRegistry, StaticRegistry,
};
pub use model::{Entity, EntityReference};

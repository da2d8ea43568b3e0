//! Import notifications
//!
//! At the end of a run the importer announces what it created and what it
//! updated. Listeners get each event by reference and return nothing.

use crate::core::types::Uuid;
use crate::entity::Entity;
use std::collections::HashMap;
use std::fmt;

/// Entities keyed by UUID, iterated in the order they were added
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySet {
    order: Vec<Uuid>,
    entities: HashMap<Uuid, Entity>,
}

impl EntitySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity; a UUID added twice keeps its first position
    pub fn insert(&mut self, entity: Entity) {
        let uuid = entity.uuid();
        if self.entities.insert(uuid, entity).is_none() {
            self.order.push(uuid);
        }
    }

    /// Entity for a UUID
    pub fn get(&self, uuid: &Uuid) -> Option<&Entity> {
        self.entities.get(uuid)
    }

    /// Whether the set contains a UUID
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.entities.contains_key(uuid)
    }

    /// UUIDs in insertion order
    pub fn uuids(&self) -> &[Uuid] {
        &self.order
    }

    /// Entities in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|uuid| self.entities.get(uuid))
    }

    /// Position of a UUID in insertion order
    pub fn position(&self, uuid: &Uuid) -> Option<usize> {
        self.order.iter().position(|u| u == uuid)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Which announcement an event is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImportEventKind {
    /// Entities created by the run
    Imported,
    /// Existing entities updated by the run
    Updated,
}

impl ImportEventKind {
    /// Event name as seen by listeners on other systems
    pub fn name(self) -> &'static str {
        match self {
            Self::Imported => "default_content.import",
            Self::Updated => "default_content.update",
        }
    }
}

impl fmt::Display for ImportEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A completed-import announcement
#[derive(Clone, Debug, PartialEq)]
pub struct ImportEvent {
    /// Created or updated
    pub kind: ImportEventKind,
    /// Module that provided the content
    pub module: String,
    /// Entities the event is about
    pub entities: EntitySet,
}

/// Receives import notifications
pub trait ImportListener {
    /// Called once per event
    fn on_event(&self, event: &ImportEvent);
}

impl<F> ImportListener for F
where
    F: Fn(&ImportEvent),
{
    fn on_event(&self, event: &ImportEvent) {
        self(event)
    }
}

/// Ordered set of listeners
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Box<dyn ImportListener>>,
}

impl EventDispatcher {
    /// Dispatcher without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener
    pub fn subscribe(&mut self, listener: impl ImportListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver an event to every listener, in subscription order
    pub fn dispatch(&self, event: &ImportEvent) {
        tracing::debug!(
            event = %event.kind,
            module = %event.module,
            entities = event.entities.len(),
            "dispatching"
        );
        for listener in &self.listeners {
            listener.on_event(event);
        }
    }

    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether there are no listeners
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Listener forwarding events over a channel
#[derive(Clone, Debug)]
pub struct ChannelListener {
    sender: flume::Sender<ImportEvent>,
}

impl ChannelListener {
    /// Listener plus the receiving end of its channel
    pub fn new() -> (Self, flume::Receiver<ImportEvent>) {
        let (sender, receiver) = flume::unbounded();
        (Self { sender }, receiver)
    }
}

impl ImportListener for ChannelListener {
    fn on_event(&self, event: &ImportEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.sender.send(event.clone());
    }
}

//! Dependency graph construction
//!
//! Vertices live in an arena owned by the run; a UUID index guarantees there is
//! exactly one vertex per distinct UUID, whether it was exported as a record or
//! only referenced by one.

use crate::core::error::Result;
use crate::core::types::Uuid;
use crate::graph::record::{Record, RecordStore};
use std::collections::HashMap;
use tracing::trace;

/// Arena index of a vertex
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(usize);

impl VertexId {
    /// Position in discovery order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Graph vertex
#[derive(Clone, Debug)]
pub struct Vertex {
    /// UUID of the entity
    pub uuid: Uuid,
    /// Vertices this one embeds, in insertion order, without duplicates
    pub edges: Vec<VertexId>,
    /// Whether a record exports this UUID
    pub declared: bool,
}

/// Directed graph of "embeds / depends on" edges between UUIDs
#[derive(Debug, Default)]
pub struct DependencyGraph {
    vertices: Vec<Vertex>,
    index: HashMap<Uuid, VertexId>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex for a UUID, created on first sight
    pub fn vertex(&mut self, uuid: Uuid) -> VertexId {
        if let Some(&id) = self.index.get(&uuid) {
            return id;
        }

        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            uuid,
            edges: Vec::new(),
            declared: false,
        });
        self.index.insert(uuid, id);
        id
    }

    /// Vertex for an exported record's UUID
    pub fn declare(&mut self, uuid: Uuid) -> VertexId {
        let id = self.vertex(uuid);
        self.vertices[id.0].declared = true;
        id
    }

    /// Add an edge `from -> to`; returns false if it already existed
    pub fn add_edge(&mut self, from: VertexId, to: VertexId) -> bool {
        let edges = &mut self.vertices[from.0].edges;
        if edges.contains(&to) {
            return false;
        }
        edges.push(to);
        true
    }

    /// Existing vertex for a UUID
    pub fn vertex_id(&self, uuid: &Uuid) -> Option<VertexId> {
        self.index.get(uuid).copied()
    }

    /// Vertex by id
    pub fn get(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    /// All vertices with their ids, in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter().enumerate().map(|(i, v)| (VertexId(i), v))
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Total number of edges
    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(|v| v.edges.len()).sum()
    }
}

/// Populates the record store and the dependency graph in a single pass
#[derive(Debug, Default)]
pub struct GraphBuilder {
    records: RecordStore,
    graph: DependencyGraph,
}

impl GraphBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record and its embedded references.
    ///
    /// Fails on a UUID that was already registered; nothing is added in that case.
    pub fn ingest(&mut self, record: Record) -> Result<VertexId> {
        let uuid = record.uuid;
        let embedded = record.embedded.clone();
        self.records.insert(record)?;

        let vertex = self.graph.declare(uuid);
        for target in embedded {
            let edge = self.graph.vertex(target);
            if self.graph.add_edge(vertex, edge) {
                trace!(%uuid, %target, "dependency edge");
            }
        }

        Ok(vertex)
    }

    /// Records registered so far
    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Graph built so far
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Split into the record store and the graph
    pub fn into_parts(self) -> (RecordStore, DependencyGraph) {
        (self.records, self.graph)
    }
}

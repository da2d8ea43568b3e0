//! Record store, dependency graph and ordering
//!
//! Records are ingested once per run into a [`RecordStore`] and a
//! [`DependencyGraph`]; [`sort`] then orders every vertex so that embedded
//! entities come before the entities embedding them.

pub mod builder;
pub mod record;
pub mod sort;

pub use builder::{DependencyGraph, GraphBuilder, Vertex, VertexId};
pub use record::{Record, RecordStore};
pub use sort::{depths, sort, SortedVertex};

//! Dependency ordering
//!
//! A depth-first search assigns every vertex a depth: zero for vertices that
//! embed nothing, otherwise one more than the deepest vertex it embeds. Sorting
//! by depth puts every dependency before its dependents. Remaining ties are
//! broken by declared weight (absent counts as 0) and then by discovery order.
//!
//! Cycles are tolerated. Vertices are marked in-progress while their subtree is
//! being explored, and an edge back to an in-progress vertex contributes
//! nothing to the depth. The resulting order is best-effort for the vertices on
//! the cycle and still total and deterministic.

use crate::core::types::Uuid;
use crate::graph::builder::{DependencyGraph, VertexId};
use std::cmp::Ordering;
use tracing::debug;

/// A vertex with the metadata it was ordered by
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortedVertex {
    /// Arena id of the vertex
    pub id: VertexId,
    /// UUID of the vertex
    pub uuid: Uuid,
    /// Length of the longest dependency chain below this vertex
    pub depth: usize,
    /// Declared weight, 0 when absent
    pub weight: i64,
    /// UUIDs this vertex embeds
    pub edges: Vec<Uuid>,
}

impl SortedVertex {
    fn order(&self, other: &Self) -> Ordering {
        self.depth
            .cmp(&other.depth)
            .then(self.weight.cmp(&other.weight))
            .then(self.id.cmp(&other.id))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Compute the dependency depth of every vertex.
///
/// Returns the depths indexed by discovery order and the number of back edges
/// (edges closing a cycle) that were ignored.
pub fn depths(graph: &DependencyGraph) -> (Vec<usize>, usize) {
    let vertices: Vec<&[VertexId]> = graph.iter().map(|(_, v)| v.edges.as_slice()).collect();
    let mut marks = vec![Mark::Unvisited; vertices.len()];
    let mut depth = vec![0usize; vertices.len()];
    let mut back_edges = 0;

    // Explicit stack of (vertex, next edge to follow); long chains must not
    // exhaust the call stack.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..vertices.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::InProgress;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let (v, next) = *top;
            if let Some(&target) = vertices[v].get(next) {
                top.1 += 1;
                let u = target.index();
                match marks[u] {
                    Mark::Unvisited => {
                        marks[u] = Mark::InProgress;
                        stack.push((u, 0));
                    }
                    Mark::Done => depth[v] = depth[v].max(depth[u] + 1),
                    Mark::InProgress => back_edges += 1,
                }
            } else {
                marks[v] = Mark::Done;
                stack.pop();
                if let Some(&(parent, _)) = stack.last() {
                    depth[parent] = depth[parent].max(depth[v] + 1);
                }
            }
        }
    }

    (depth, back_edges)
}

/// Order all vertices so that dependencies come first.
///
/// `weight` supplies the declared weight of a UUID, if any.
pub fn sort(graph: &DependencyGraph, weight: impl Fn(&Uuid) -> Option<i64>) -> Vec<SortedVertex> {
    let (depth, back_edges) = depths(graph);
    if back_edges > 0 {
        debug!(back_edges, "dependency cycle detected, using best-effort order");
    }

    let mut sorted: Vec<SortedVertex> = graph
        .iter()
        .map(|(id, vertex)| SortedVertex {
            id,
            uuid: vertex.uuid,
            depth: depth[id.index()],
            weight: weight(&vertex.uuid).unwrap_or(0),
            edges: vertex.edges.iter().map(|&e| graph.get(e).uuid).collect(),
        })
        .collect();

    sorted.sort_by(SortedVertex::order);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn graph_with(n: usize, edges: &[(usize, usize)]) -> (DependencyGraph, Vec<Uuid>) {
        let mut graph = DependencyGraph::new();
        let uuids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let ids: Vec<VertexId> = uuids.iter().map(|&u| graph.declare(u)).collect();
        for &(from, to) in edges {
            graph.add_edge(ids[from], ids[to]);
        }
        (graph, uuids)
    }

    fn positions(sorted: &[SortedVertex]) -> HashMap<Uuid, usize> {
        sorted.iter().enumerate().map(|(i, v)| (v.uuid, i)).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();
        assert!(sort(&graph, |_| None).is_empty());
    }

    #[test]
    fn test_chain_is_reversed() {
        // 0 embeds 1 embeds 2
        let (graph, uuids) = graph_with(3, &[(0, 1), (1, 2)]);
        let sorted = sort(&graph, |_| None);
        let order: Vec<Uuid> = sorted.iter().map(|v| v.uuid).collect();
        assert_eq!(order, vec![uuids[2], uuids[1], uuids[0]]);
        assert_eq!(sorted[2].depth, 2);
        assert_eq!(sorted[2].edges, vec![uuids[1]]);
    }

    #[test]
    fn test_ties_use_weight_then_discovery() {
        let (graph, uuids) = graph_with(4, &[]);
        let weights: HashMap<Uuid, i64> = [(uuids[0], 5), (uuids[3], -1)].into_iter().collect();
        let order: Vec<Uuid> = sort(&graph, |u| weights.get(u).copied())
            .into_iter()
            .map(|v| v.uuid)
            .collect();
        assert_eq!(order, vec![uuids[3], uuids[1], uuids[2], uuids[0]]);
    }

    #[test]
    fn test_depth_dominates_weight() {
        // 0 embeds 1; 1 is heavy but must still come first
        let (graph, uuids) = graph_with(2, &[(0, 1)]);
        let order: Vec<Uuid> = sort(&graph, |u| (*u == uuids[1]).then_some(100))
            .into_iter()
            .map(|v| v.uuid)
            .collect();
        assert_eq!(order, vec![uuids[1], uuids[0]]);
    }

    #[test]
    fn test_discovery_order_does_not_matter_for_dags() {
        // Dependency discovered last still sorts first
        let (graph, uuids) = graph_with(3, &[(0, 2), (1, 2)]);
        let order = positions(&sort(&graph, |_| None));
        assert!(order[&uuids[2]] < order[&uuids[0]]);
        assert!(order[&uuids[2]] < order[&uuids[1]]);
    }

    #[test]
    fn test_cycle_terminates_deterministically() {
        let edges = [(0, 1), (1, 2), (2, 0), (3, 0)];
        let (graph, _) = graph_with(4, &edges);
        let (depth, back_edges) = depths(&graph);
        assert_eq!(back_edges, 1);
        assert_eq!(depth, vec![2, 1, 0, 3]);

        let first: Vec<VertexId> = sort(&graph, |_| None).into_iter().map(|v| v.id).collect();
        let second: Vec<VertexId> = sort(&graph, |_| None).into_iter().map(|v| v.id).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_self_edge() {
        let (graph, _) = graph_with(1, &[(0, 0)]);
        let sorted = sort(&graph, |_| None);
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].depth, 0);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let n = 50_000;
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let (graph, uuids) = graph_with(n, &edges);
        let sorted = sort(&graph, |_| None);
        assert_eq!(sorted[0].uuid, uuids[n - 1]);
        assert_eq!(sorted[n - 1].depth, n - 1);
    }

    proptest! {
        #[test]
        fn prop_acyclic_dependencies_come_first(
            n in 1usize..40,
            raw in proptest::collection::vec((0usize..40, 0usize..40), 0..120),
        ) {
            // Only keep edges from a higher to a lower index: always acyclic
            let edges: Vec<(usize, usize)> = raw
                .into_iter()
                .map(|(a, b)| (a % n, b % n))
                .filter(|(a, b)| a > b)
                .collect();
            let (graph, uuids) = graph_with(n, &edges);
            let sorted = sort(&graph, |_| None);
            let order = positions(&sorted);

            prop_assert_eq!(sorted.len(), n);
            for (from, to) in edges {
                prop_assert!(order[&uuids[to]] < order[&uuids[from]]);
            }
        }

        #[test]
        fn prop_any_graph_yields_total_order(
            n in 1usize..40,
            raw in proptest::collection::vec((0usize..40, 0usize..40), 0..160),
        ) {
            let edges: Vec<(usize, usize)> = raw.into_iter().map(|(a, b)| (a % n, b % n)).collect();
            let (graph, _) = graph_with(n, &edges);
            let sorted = sort(&graph, |_| None);

            prop_assert_eq!(sorted.len(), n);
            let mut seen: Vec<usize> = sorted.iter().map(|v| v.id.index()).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }
}

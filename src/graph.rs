//! Labeled directed multigraph: the shared input type for every RPQ/CFPQ
//! engine.

use crate::error::{EngineError, EngineResult};
use crate::value::VertexId;
use std::collections::HashSet;

/// A single labeled edge `(source, label, target)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: VertexId,
    pub label: String,
    pub target: VertexId,
}

/// An ordered set of vertices and a multiset of labeled edges.
///
/// Invariant: every edge's endpoints are in the vertex set (enforced by
/// [`LabeledGraph::add_edge`]; violating it requires going through
/// `unchecked` construction, which callers should not do outside adapters
/// that already guarantee the invariant).
#[derive(Debug, Clone, Default)]
pub struct LabeledGraph {
    vertices: Vec<VertexId>,
    vertex_index: std::collections::HashMap<VertexId, usize>,
    edges: Vec<Edge>,
}

impl LabeledGraph {
    #[must_use]
    pub fn new() -> Self {
        LabeledGraph::default()
    }

    /// Add a vertex if it is not already present; no-op otherwise.
    pub fn add_vertex(&mut self, v: VertexId) {
        if !self.vertex_index.contains_key(&v) {
            self.vertex_index.insert(v.clone(), self.vertices.len());
            self.vertices.push(v);
        }
    }

    /// Add a labeled edge, inserting its endpoints if necessary.
    pub fn add_edge(&mut self, source: VertexId, label: impl Into<String>, target: VertexId) {
        self.add_vertex(source.clone());
        self.add_vertex(target.clone());
        self.edges.push(Edge {
            source,
            label: label.into(),
            target,
        });
    }

    #[must_use]
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn vertex_index(&self, v: &VertexId) -> Option<usize> {
        self.vertex_index.get(v).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Distinct edge labels used in this graph, in first-seen order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for e in &self.edges {
            if seen.insert(e.label.as_str()) {
                out.push(e.label.as_str());
            }
        }
        out
    }

    /// Validate that every vertex referenced by `starts`/`finals` is present
    /// in this graph's vertex set; used by the RPQ/CFPQ engines to reject a
    /// caller-supplied filter set up front instead of silently producing an
    /// empty result.
    pub fn validate_subset(&self, vs: &HashSet<VertexId>) -> EngineResult<()> {
        for v in vs {
            if !self.vertex_index.contains_key(v) {
                return Err(EngineError::TypeError(format!(
                    "vertex {v} is not a vertex of this graph"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_registers_both_endpoints() {
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        assert_eq!(g.len(), 2);
        assert_eq!(g.edges().len(), 1);
    }

    #[test]
    fn labels_are_first_seen_order_deduplicated() {
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        g.add_edge(VertexId::int(1), "b", VertexId::int(2));
        g.add_edge(VertexId::int(2), "a", VertexId::int(0));
        assert_eq!(g.labels(), vec!["a", "b"]);
    }

    #[test]
    fn zero_vertex_graph_is_empty() {
        let g = LabeledGraph::new();
        assert!(g.is_empty());
        assert_eq!(g.len(), 0);
    }
}

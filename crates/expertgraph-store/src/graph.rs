//! In-memory knowledge graph backend using petgraph.
//!
//! Nodes and edges live in a `DiGraph`; node and edge indices follow
//! insertion order, which is the order every listing returns. The backend
//! does no locking and no IO; [`crate::GraphStore`] wraps it for both.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use expertgraph_core::{Error, Result};

use crate::types::*;

/// Directed graph of [`Node`]s connected by [`Edge`]s, keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct GraphBackend {
    graph: DiGraph<Node, Edge>,
    node_index: HashMap<String, NodeIndex>,
}

impl GraphBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a backend from stored nodes and edges.
    ///
    /// Edges whose endpoints are not among `nodes` cannot be represented and
    /// are returned separately.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> (Self, Vec<Edge>) {
        let mut backend = Self::new();
        for node in nodes {
            backend.upsert_node(node);
        }
        let mut dangling = Vec::new();
        for edge in edges {
            if let Err(edge) = backend.push_edge(edge) {
                dangling.push(edge);
            }
        }
        (backend, dangling)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Insert a node, or replace the node with the same id in place.
    ///
    /// A replaced node keeps its position and its edges. Returns the
    /// previous node, if any.
    pub fn upsert_node(&mut self, node: Node) -> Option<Node> {
        match self.node_index.get(&node.id) {
            Some(&idx) => Some(std::mem::replace(&mut self.graph[idx], node)),
            None => {
                let id = node.id.clone();
                let idx = self.graph.add_node(node);
                self.node_index.insert(id, idx);
                None
            }
        }
    }

    /// Append an edge after checking that both endpoints exist.
    ///
    /// On failure nothing is recorded.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<()> {
        let missing = [&edge.source, &edge.target]
            .into_iter()
            .find(|id| !self.contains(id))
            .cloned();
        if let Some(missing) = missing {
            return Err(Error::ReferentialIntegrity {
                from: edge.source,
                to: edge.target,
                missing,
            });
        }
        self.push_edge(edge)
            .map(|_| ())
            .map_err(|edge| Error::NotFound(edge.source))
    }

    fn push_edge(&mut self, edge: Edge) -> std::result::Result<EdgeIndex, Edge> {
        let endpoints = (
            self.node_index.get(&edge.source).copied(),
            self.node_index.get(&edge.target).copied(),
        );
        match endpoints {
            (Some(a), Some(b)) => Ok(self.graph.add_edge(a, b, edge)),
            _ => Err(edge),
        }
    }

    /// Remove a node together with every edge that touches it.
    ///
    /// The graph is rebuilt so that insertion order of the remaining nodes
    /// and edges is preserved.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, usize)> {
        if !self.contains(id) {
            return None;
        }

        let (nodes, edges) = std::mem::take(&mut self.graph).into_nodes_edges();
        self.node_index.clear();

        let mut removed = None;
        for node in nodes {
            if node.weight.id == id {
                removed = Some(node.weight);
            } else {
                self.upsert_node(node.weight);
            }
        }

        let mut dropped = 0;
        for edge in edges {
            let edge = edge.weight;
            if edge.source == id || edge.target == id {
                dropped += 1;
            } else if self.push_edge(edge).is_err() {
                dropped += 1;
            }
        }

        removed.map(|node| (node, dropped))
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_index.clear();
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Nodes whose type equals `node_type` exactly.
    pub fn nodes_by_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes().filter(move |n| n.node_type == node_type)
    }

    /// Edges with `id` as source or target, in insertion order.
    pub fn edges_touching<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges()
            .filter(move |e| e.source == id || e.target == id)
    }

    // ---------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------

    /// Case-insensitive substring search over id, name, type and property
    /// values.
    ///
    /// This is a full scan: O(nodes × property values). There is no index.
    pub fn search(&self, query: &str) -> Vec<&Node> {
        let needle = query.to_lowercase();
        self.nodes()
            .filter(|node| node_matches(node, &needle))
            .collect()
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    /// Neighbors of `id` reached through edges in `direction`, optionally
    /// restricted to one edge type.
    ///
    /// Results are ordered by edge insertion. A node reached through several
    /// edges appears once per edge.
    pub fn neighbors(
        &self,
        id: &str,
        edge_type: Option<&str>,
        direction: Direction,
    ) -> Vec<(&Node, &Edge, RelationDirection)> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };

        let mut hits: Vec<(EdgeIndex, NodeIndex, RelationDirection)> = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            hits.extend(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Outgoing)
                    .map(|e| (e.id(), e.target(), RelationDirection::Outgoing)),
            );
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            hits.extend(
                self.graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    // a self-loop was already reported as outgoing
                    .filter(|e| direction == Direction::Incoming || e.source() != idx)
                    .map(|e| (e.id(), e.source(), RelationDirection::Incoming)),
            );
        }
        hits.sort_by_key(|(edge, _, _)| edge.index());

        hits.into_iter()
            .map(|(edge, node, dir)| (&self.graph[node], &self.graph[edge], dir))
            .filter(|(_, edge, _)| edge_type.map_or(true, |t| edge.edge_type == t))
            .collect()
    }

    /// Distinct nodes reachable from `id` over one outgoing edge.
    ///
    /// Incoming edges are not followed; a reverse link exists only if an
    /// inverse edge was recorded.
    pub fn related(&self, id: &str, edge_type: Option<&str>) -> Vec<&Node> {
        let mut seen = HashSet::new();
        self.neighbors(id, edge_type, Direction::Outgoing)
            .into_iter()
            .filter(|(node, _, _)| seen.insert(node.id.as_str()))
            .map(|(node, _, _)| node)
            .collect()
    }

    /// Get graph statistics.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            ..Default::default()
        };
        for node in self.nodes() {
            *stats.node_types.entry(node.node_type.clone()).or_default() += 1;
        }
        for edge in self.edges() {
            *stats.edge_types.entry(edge.edge_type.clone()).or_default() += 1;
        }
        stats
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }
}

fn node_matches(node: &Node, needle: &str) -> bool {
    node.id.to_lowercase().contains(needle)
        || node.name.to_lowercase().contains(needle)
        || node.node_type.to_lowercase().contains(needle)
        || node.properties.values().any(|v| value_matches(v, needle))
}

/// Match a property value by its string rendering. `null` never matches.
fn value_matches(value: &PropertyValue, needle: &str) -> bool {
    use serde_json::Value;

    match value {
        Value::Null => false,
        Value::Bool(b) => b.to_string().contains(needle),
        Value::Number(n) => n.to_string().to_lowercase().contains(needle),
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|v| value_matches(v, needle)),
        Value::Object(map) => map.values().any(|v| value_matches(v, needle)),
    }
}

//! Data types for nodes, edges, traversal results and store status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use expertgraph_core::{Error, Result};

/// A property value. Any JSON value is accepted; no schema is enforced.
pub type PropertyValue = serde_json::Value;

/// Property bag attached to nodes and edges.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Convert a JSON value into a property bag.
///
/// `null` yields an empty bag; anything other than an object is rejected.
pub fn properties_from_value(value: serde_json::Value) -> Result<Properties> {
    match value {
        serde_json::Value::Null => Ok(Properties::new()),
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(Error::InvalidArgument(format!(
            "properties must be a JSON object, got {}",
            other
        ))),
    }
}

/// A node (entity) in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Store-wide unique identifier. Equals `name` under the name scheme.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: Properties,
}

/// A directed, typed edge (relationship) between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: Properties,
}

/// Options for [`crate::GraphStore::add_edge`].
#[derive(Debug, Clone, Default)]
pub struct EdgeOptions {
    pub properties: Properties,
    /// Also record an inverse edge from target back to source.
    pub bidirectional: bool,
    /// Type of the inverse edge. Defaults to `inverse_<type>`.
    pub inverse_type: Option<String>,
}

impl EdgeOptions {
    pub fn bidirectional() -> Self {
        Self {
            bidirectional: true,
            ..Default::default()
        }
    }
}

/// Which edges a traversal follows, relative to the starting node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

/// Orientation of a single traversed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationDirection {
    Outgoing,
    Incoming,
}

/// The edge through which a neighbor was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub direction: RelationDirection,
    pub properties: Properties,
}

/// A neighbor node annotated with the relation that reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedNode {
    #[serde(flatten)]
    pub node: Node,
    pub relation: Relation,
}

/// Full copy of the graph contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Graph-level statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub node_types: BTreeMap<String, usize>,
    pub edge_types: BTreeMap<String, usize>,
}

/// Whether the backing file reflects the in-memory graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Memory holds changes that the last write failed to persist.
    pub dirty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

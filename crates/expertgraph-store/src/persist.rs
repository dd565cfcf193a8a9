//! JSON snapshot file format.
//!
//! The whole graph is written as one pretty-printed document on every save:
//!
//! ```json
//! {
//!   "version": 1,
//!   "updated_at": "2024-05-01T12:00:00Z",
//!   "nodes": { "<id>": { "type": "...", "created_at": "...", "properties": {} } },
//!   "edges": [ { "source": "...", "target": "...", "type": "...", "created_at": "...", "properties": {} } ]
//! }
//! ```
//!
//! A node carries a `name` entry only when its name differs from its id.
//! The `nodes` map is written and read back in insertion order.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use expertgraph_core::Result;

use crate::graph::GraphBackend;
use crate::types::*;

pub const FORMAT_VERSION: u32 = 1;

/// A parsed snapshot file.
#[derive(Debug, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    nodes: NodeTable,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphDocument {
    /// Nodes in file order.
    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        let nodes = self
            .nodes
            .0
            .into_iter()
            .map(|(id, stored)| Node {
                name: stored.name.unwrap_or_else(|| id.clone()),
                id,
                node_type: stored.node_type,
                created_at: stored.created_at,
                properties: stored.properties,
            })
            .collect();
        (nodes, self.edges)
    }
}

#[derive(Debug, Deserialize)]
struct StoredNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Serialize)]
struct StoredNodeRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(rename = "type")]
    node_type: &'a str,
    created_at: &'a DateTime<Utc>,
    properties: &'a Properties,
}

impl<'a> From<&'a Node> for StoredNodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            name: (node.name != node.id).then_some(node.name.as_str()),
            node_type: &node.node_type,
            created_at: &node.created_at,
            properties: &node.properties,
        }
    }
}

/// Node entries keyed by id, kept in document order.
#[derive(Debug, Default)]
struct NodeTable(Vec<(String, StoredNode)>);

impl<'de> Deserialize<'de> for NodeTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NodeTableVisitor;

        impl<'de> Visitor<'de> for NodeTableVisitor {
            type Value = NodeTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node id to node")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<NodeTable, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, StoredNode>()? {
                    entries.push(entry);
                }
                Ok(NodeTable(entries))
            }
        }

        deserializer.deserialize_map(NodeTableVisitor)
    }
}

struct NodeTableRef<'a>(&'a GraphBackend);

impl Serialize for NodeTableRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.node_count()))?;
        for node in self.0.nodes() {
            map.serialize_entry(&node.id, &StoredNodeRef::from(node))?;
        }
        map.end()
    }
}

struct EdgeListRef<'a>(&'a GraphBackend);

impl Serialize for EdgeListRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.edges())
    }
}

#[derive(Serialize)]
struct GraphDocumentRef<'a> {
    version: u32,
    updated_at: DateTime<Utc>,
    nodes: NodeTableRef<'a>,
    edges: EdgeListRef<'a>,
}

/// Render the graph as a snapshot document.
pub fn to_json(graph: &GraphBackend) -> Result<String> {
    let doc = GraphDocumentRef {
        version: FORMAT_VERSION,
        updated_at: Utc::now(),
        nodes: NodeTableRef(graph),
        edges: EdgeListRef(graph),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Read a snapshot file. A missing file yields `Ok(None)`.
pub fn read_document(path: &Path) -> Result<Option<GraphDocument>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

/// Overwrite `path` with a full snapshot, creating parent directories.
pub fn write_document(path: &Path, graph: &GraphBackend) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = to_json(graph)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Delete the snapshot file. A missing file is not an error.
pub fn remove_document(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

//! Graph store — locking, identity assignment and snapshot persistence.

use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use expertgraph_core::{Error, GraphConfig, IdScheme, Result};

use crate::graph::GraphBackend;
use crate::persist;
use crate::types::*;

/// Knowledge graph with typed nodes, directed edges and a JSON backing file.
///
/// Reads are served from memory. Every mutation holds the write lock while
/// it changes the graph and rewrites the whole backing file, so operations
/// on one store never interleave. Nothing coordinates separate processes
/// that share a file; the last writer wins.
///
/// A failed write does not undo the mutation. The store logs it, and
/// [`GraphStore::sync_status`] reports memory as ahead of disk until the
/// next successful save.
pub struct GraphStore {
    path: Option<PathBuf>,
    id_scheme: IdScheme,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    graph: GraphBackend,
    sync: SyncStatus,
}

impl GraphStore {
    /// Open a store, loading the backing file if it exists.
    ///
    /// Never fails: a missing file starts an empty graph, and an unreadable
    /// or malformed file is logged and also starts an empty graph.
    pub fn open(config: GraphConfig) -> Self {
        let store = Self {
            path: config.path,
            id_scheme: config.id_scheme,
            state: RwLock::new(StoreState::default()),
        };
        store.reload();
        store
    }

    /// Open a name-keyed store backed by `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Self {
        Self::open(GraphConfig::with_path(path))
    }

    /// A store without a backing file.
    pub fn in_memory(id_scheme: IdScheme) -> Self {
        Self::open(GraphConfig::in_memory(id_scheme))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn id_scheme(&self) -> IdScheme {
        self.id_scheme
    }

    // ---------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------

    /// Add a node and return its id.
    ///
    /// Under [`IdScheme::Name`] the name is the id and re-adding a name
    /// replaces the earlier node (its edges are kept). Under
    /// [`IdScheme::Uuid`] every call creates a new node.
    pub fn add_node(&self, name: &str, node_type: &str, properties: Properties) -> Result<String> {
        let id = match self.id_scheme {
            IdScheme::Name if name.is_empty() => {
                return Err(Error::InvalidArgument("node name must not be empty".into()));
            }
            IdScheme::Name => name.to_string(),
            IdScheme::Uuid => uuid::Uuid::new_v4().to_string(),
        };

        let node = Node {
            id: id.clone(),
            name: name.to_string(),
            node_type: node_type.to_string(),
            created_at: Utc::now(),
            properties,
        };

        let mut state = self.state.write();
        if state.graph.upsert_node(node).is_some() {
            debug!("Replaced node {} ({})", id, node_type);
        } else {
            debug!("Added node {} ({})", id, node_type);
        }
        self.persist(&mut state);
        Ok(id)
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.state.read().graph.node(id).cloned()
    }

    /// Resolve several ids at once, skipping unknown ones.
    pub fn open_nodes<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Node> {
        let state = self.state.read();
        ids.iter()
            .filter_map(|id| state.graph.node(id.as_ref()).cloned())
            .collect()
    }

    /// Nodes of exactly `node_type`, in insertion order.
    pub fn get_nodes_by_type(&self, node_type: &str) -> Vec<Node> {
        self.state
            .read()
            .graph
            .nodes_by_type(node_type)
            .cloned()
            .collect()
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&self, id: &str) -> Option<Node> {
        let mut state = self.state.write();
        let (node, dropped) = state.graph.remove_node(id)?;
        debug!("Removed node {} and {} edges", id, dropped);
        self.persist(&mut state);
        Some(node)
    }

    // ---------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------

    /// Add a directed edge `source -> target`.
    ///
    /// Both endpoints must already exist, otherwise
    /// [`Error::ReferentialIntegrity`] is returned and nothing is recorded.
    /// With [`EdgeOptions::bidirectional`] an inverse edge `target -> source`
    /// is appended as well.
    pub fn add_edge(
        &self,
        source: &str,
        target: &str,
        edge_type: &str,
        options: EdgeOptions,
    ) -> Result<()> {
        let mut state = self.state.write();
        // both endpoints are checked up front so a bidirectional add is all or nothing
        for id in [source, target] {
            if !state.graph.contains(id) {
                return Err(Error::ReferentialIntegrity {
                    from: source.to_string(),
                    to: target.to_string(),
                    missing: id.to_string(),
                });
            }
        }

        let now = Utc::now();
        let inverse = options.bidirectional.then(|| Edge {
            source: target.to_string(),
            target: source.to_string(),
            edge_type: options
                .inverse_type
                .clone()
                .unwrap_or_else(|| format!("inverse_{}", edge_type)),
            created_at: now,
            properties: options.properties.clone(),
        });

        state.graph.insert_edge(Edge {
            source: source.to_string(),
            target: target.to_string(),
            edge_type: edge_type.to_string(),
            created_at: now,
            properties: options.properties,
        })?;
        if let Some(inverse) = inverse {
            debug!("Added inverse edge {} -[{}]-> {}", target, inverse.edge_type, source);
            state.graph.insert_edge(inverse)?;
        }
        debug!("Added edge {} -[{}]-> {}", source, edge_type, target);

        self.persist(&mut state);
        Ok(())
    }

    /// All edges, or only those with `id` as an endpoint.
    pub fn get_edges(&self, id: Option<&str>) -> Vec<Edge> {
        let state = self.state.read();
        match id {
            Some(id) => state.graph.edges_touching(id).cloned().collect(),
            None => state.graph.edges().cloned().collect(),
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Case-insensitive substring search over ids, names, types and
    /// property values. Full scan, linear in nodes times properties.
    pub fn search(&self, query: &str) -> Vec<Node> {
        self.state
            .read()
            .graph
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Distinct targets of the outgoing edges of `id`, optionally of one type.
    ///
    /// Incoming edges are not followed. Register the reverse direction with
    /// a bidirectional edge, or use [`GraphStore::neighbors`].
    pub fn get_related(&self, id: &str, relationship_type: Option<&str>) -> Vec<Node> {
        self.state
            .read()
            .graph
            .related(id, relationship_type)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Neighbors of `id` in the given direction, each with the edge that
    /// reached it.
    pub fn neighbors(
        &self,
        id: &str,
        relationship_type: Option<&str>,
        direction: Direction,
    ) -> Vec<RelatedNode> {
        self.state
            .read()
            .graph
            .neighbors(id, relationship_type, direction)
            .into_iter()
            .map(|(node, edge, direction)| RelatedNode {
                node: node.clone(),
                relation: Relation {
                    relation_type: edge.edge_type.clone(),
                    direction,
                    properties: edge.properties.clone(),
                },
            })
            .collect()
    }

    /// Copy of every node and edge.
    pub fn get_all(&self) -> GraphSnapshot {
        self.state.read().graph.snapshot()
    }

    pub fn stats(&self) -> GraphStats {
        self.state.read().graph.stats()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.state.read().sync.clone()
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    /// Empty the graph and delete the backing file. Idempotent.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.graph.clear();
        if let Some(path) = &self.path {
            match persist::remove_document(path) {
                Ok(()) => state.sync = SyncStatus::default(),
                Err(e) => {
                    warn!("Failed to remove knowledge graph file {}: {}", path.display(), e);
                    state.sync.dirty = true;
                    state.sync.last_error = Some(e.to_string());
                }
            }
        }
        info!("Knowledge graph cleared");
    }

    /// Replace memory with the contents of the backing file.
    ///
    /// Same rules as [`GraphStore::open`]: missing or unreadable files give
    /// an empty graph.
    pub fn reload(&self) {
        let mut state = self.state.write();
        state.sync = SyncStatus::default();
        let Some(path) = &self.path else {
            return;
        };

        state.graph = match persist::read_document(path) {
            Ok(Some(doc)) => {
                let (nodes, edges) = doc.into_parts();
                let (graph, dangling) = GraphBackend::from_parts(nodes, edges);
                for edge in &dangling {
                    warn!(
                        "Dropping edge {} -[{}]-> {}: endpoint not found",
                        edge.source, edge.edge_type, edge.target
                    );
                }
                graph
            }
            Ok(None) => GraphBackend::new(),
            Err(e) => {
                warn!("Error loading knowledge graph from {}: {}", path.display(), e);
                GraphBackend::new()
            }
        };

        info!(
            "Knowledge graph loaded: {} nodes, {} edges, path={}",
            state.graph.node_count(),
            state.graph.edge_count(),
            path.display()
        );
    }

    /// Write the full graph to the backing file now.
    ///
    /// Mutations already do this; call it to retry after a failed write.
    pub fn save(&self) -> Result<()> {
        let mut state = self.state.write();
        let Some(path) = &self.path else {
            return Ok(());
        };
        match persist::write_document(path, &state.graph) {
            Ok(()) => {
                state.sync = SyncStatus {
                    dirty: false,
                    last_error: None,
                    last_saved_at: Some(Utc::now()),
                };
                Ok(())
            }
            Err(e) => {
                state.sync.dirty = true;
                state.sync.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn persist(&self, state: &mut StoreState) {
        let Some(path) = &self.path else {
            return;
        };
        match persist::write_document(path, &state.graph) {
            Ok(()) => {
                state.sync = SyncStatus {
                    dirty: false,
                    last_error: None,
                    last_saved_at: Some(Utc::now()),
                };
            }
            Err(e) => {
                warn!(
                    "Failed to save knowledge graph to {}: {} (memory is ahead of disk)",
                    path.display(),
                    e
                );
                state.sync.dirty = true;
                state.sync.last_error = Some(e.to_string());
            }
        }
    }
}

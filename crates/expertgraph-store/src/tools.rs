//! Read-only graph tools for a request/response tool server.
//!
//! [`dispatch`] maps a tool name and JSON arguments onto store queries and
//! always answers with JSON; failures become
//! `{"error": "...", "success": false}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use expertgraph_core::{Error, Result};

use crate::store::GraphStore;
use crate::types::Direction;

/// Name, description and JSON input schema of one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct OpenArgs {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedArgs {
    name: String,
    #[serde(default)]
    relationship_type: Option<String>,
    #[serde(default)]
    direction: Option<Direction>,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "read_graph",
            description: "Read the entire knowledge graph",
            input_schema: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "search_nodes",
            description: "Search for nodes in the knowledge graph based on a query",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Text matched against node names, types and property values"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "open_nodes",
            description: "Open specific nodes in the knowledge graph by their names",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "names": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Node identifiers to retrieve"
                    }
                },
                "required": ["names"]
            }),
        },
        ToolDefinition {
            name: "get_related",
            description: "List the nodes linked to a node, optionally by relationship type",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "relationship_type": { "type": "string" },
                    "direction": { "type": "string", "enum": ["outgoing", "incoming", "both"] }
                },
                "required": ["name"]
            }),
        },
    ]
}

/// Run one tool call against the store.
pub fn dispatch(store: &GraphStore, name: &str, args: &Value) -> Value {
    debug!("Tool call: {}", name);
    match call(store, name, args) {
        Ok(value) => value,
        Err(e) => {
            warn!("Error handling tool call {}: {}", name, e);
            json!({ "error": e.to_string(), "success": false })
        }
    }
}

fn call(store: &GraphStore, name: &str, args: &Value) -> Result<Value> {
    match name {
        "read_graph" => Ok(serde_json::to_value(store.get_all())?),
        "search_nodes" => {
            let args: SearchArgs = parse_args(args)?;
            Ok(serde_json::to_value(store.search(&args.query))?)
        }
        "open_nodes" => {
            let args: OpenArgs = parse_args(args)?;
            Ok(serde_json::to_value(store.open_nodes(args.names.as_slice()))?)
        }
        "get_related" => {
            let args: RelatedArgs = parse_args(args)?;
            let rel = args.relationship_type.as_deref();
            match args.direction {
                // plain nodes, same as GraphStore::get_related
                None => Ok(serde_json::to_value(store.get_related(&args.name, rel))?),
                Some(direction) => Ok(serde_json::to_value(
                    store.neighbors(&args.name, rel, direction),
                )?),
            }
        }
        other => Err(Error::NotFound(format!("Unknown tool: {}", other))),
    }
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone()).map_err(|e| Error::InvalidArgument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{properties_from_value, EdgeOptions, Properties};
    use expertgraph_core::IdScheme;

    fn review_store() -> GraphStore {
        let store = GraphStore::in_memory(IdScheme::Name);
        store
            .add_node(
                "code-1",
                "CodeSnippet",
                properties_from_value(json!({"description": "A shopping cart implementation"}))
                    .unwrap(),
            )
            .unwrap();
        store
            .add_node("bob-review-2", "CodeReview", Properties::new())
            .unwrap();
        store
            .add_edge("bob-review-2", "code-1", "reviews", EdgeOptions::default())
            .unwrap();
        store
    }

    #[test]
    fn test_definitions_are_unique() {
        let defs = tool_definitions();
        let mut names: Vec<_> = defs.iter().map(|d| d.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), defs.len());
        assert!(names.contains(&"read_graph"));
    }

    #[test]
    fn test_read_graph() {
        let store = review_store();
        let out = dispatch(&store, "read_graph", &json!({}));
        assert_eq!(out["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(out["nodes"][0]["name"], json!("code-1"));
        assert_eq!(out["edges"][0]["type"], json!("reviews"));
    }

    #[test]
    fn test_search_and_open() {
        let store = review_store();
        let out = dispatch(&store, "search_nodes", &json!({"query": "CART"}));
        assert_eq!(out.as_array().unwrap().len(), 1);
        assert_eq!(out[0]["id"], json!("code-1"));

        let out = dispatch(&store, "open_nodes", &json!({"names": ["missing", "bob-review-2"]}));
        assert_eq!(out.as_array().unwrap().len(), 1);
        assert_eq!(out[0]["type"], json!("CodeReview"));
    }

    #[test]
    fn test_get_related_with_direction() {
        let store = review_store();
        let out = dispatch(&store, "get_related", &json!({"name": "code-1"}));
        assert_eq!(out, json!([]));

        let out = dispatch(
            &store,
            "get_related",
            &json!({"name": "code-1", "direction": "incoming"}),
        );
        assert_eq!(out[0]["id"], json!("bob-review-2"));
        assert_eq!(out[0]["relation"]["type"], json!("reviews"));
    }

    #[test]
    fn test_errors_become_envelopes() {
        let store = review_store();
        let out = dispatch(&store, "delete_everything", &json!({}));
        assert_eq!(out["success"], json!(false));
        assert!(out["error"].as_str().unwrap().contains("Unknown tool"));

        let out = dispatch(&store, "search_nodes", &json!({"q": "cart"}));
        assert_eq!(out["success"], json!(false));
        assert!(out["error"].as_str().unwrap().starts_with("Invalid argument"));
    }
}

//! End-to-end tests over the public store API: a code review stored as
//! snippet, review and expert nodes, then reloaded from disk.

use std::path::Path;

use expertgraph_core::{Error, GraphConfig, IdScheme};
use expertgraph_store::{properties_from_value, EdgeOptions, GraphStore, Node, Properties};
use serde_json::json;

fn ids(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

/// A (CodeSnippet) <-reviews- B (CodeReview) <-authored- C (Expert)
fn build_review(path: &Path) -> GraphStore {
    let store = GraphStore::open_path(path);
    store
        .add_node(
            "A",
            "CodeSnippet",
            properties_from_value(json!({
                "description": "A shopping cart implementation",
                "language": "javascript",
                "lines": 120
            }))
            .unwrap(),
        )
        .unwrap();
    store
        .add_node(
            "B",
            "CodeReview",
            properties_from_value(json!({"summary": "Extract pricing rules", "score": 6.5})).unwrap(),
        )
        .unwrap();
    store
        .add_node("C", "Expert", properties_from_value(json!({"expert": "Robert C. Martin"})).unwrap())
        .unwrap();
    store.add_edge("B", "A", "reviews", EdgeOptions::default()).unwrap();
    store.add_edge("C", "B", "authored", EdgeOptions::default()).unwrap();
    store
}

/// Verify traversal follows outgoing edges only.
#[test]
fn test_traversal_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_review(&dir.path().join("kg.json"));

    assert_eq!(ids(&store.get_related("C", Some("authored"))), vec!["B"]);
    assert_eq!(ids(&store.get_related("B", Some("reviews"))), vec!["A"]);
    assert!(store.get_related("A", None).is_empty());
    assert!(store.get_related("C", Some("reviews")).is_empty());
    assert!(store.get_related("nobody", None).is_empty());
}

/// Verify a fresh store over the same file sees the same graph.
#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("kg.json");
    let before = build_review(&path).get_all();

    let reopened = GraphStore::open_path(&path);
    assert_eq!(reopened.get_all(), before);
    assert_eq!(ids(&reopened.get_nodes_by_type("CodeReview")), vec!["B"]);
    assert_eq!(ids(&reopened.get_related("C", Some("authored"))), vec!["B"]);
}

/// Verify floats that need full precision read back bit-identical.
#[test]
fn test_float_properties_round_trip_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.json");

    let store = GraphStore::open_path(&path);
    store
        .add_node(
            "B",
            "CodeReview",
            properties_from_value(json!({
                "score": 1.0715660391465826e-75,
                "ratio": 0.1 + 0.2,
                "big": 1.7976931348623157e308
            }))
            .unwrap(),
        )
        .unwrap();
    let before = store.get_all();

    let reopened = GraphStore::open_path(&path);
    assert_eq!(reopened.get_all(), before);
    let score = reopened.get_node("B").unwrap().properties["score"].as_f64().unwrap();
    assert_eq!(score.to_bits(), 1.0715660391465826e-75_f64.to_bits());
}

/// Verify the uuid identity scheme also round-trips names.
#[test]
fn test_uuid_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        path: Some(dir.path().join("kg.json")),
        id_scheme: IdScheme::Uuid,
    };

    let store = GraphStore::open(config.clone());
    let snippet = store.add_node("cart.js", "CodeSnippet", Properties::new()).unwrap();
    let review = store.add_node("review of cart.js", "CodeReview", Properties::new()).unwrap();
    store
        .add_edge(&review, &snippet, "reviews", EdgeOptions::bidirectional())
        .unwrap();

    let reopened = GraphStore::open(config);
    assert_eq!(reopened.get_all(), store.get_all());
    assert_eq!(reopened.get_node(&snippet).unwrap().name, "cart.js");
    assert_eq!(
        ids(&reopened.get_related(&snippet, Some("inverse_reviews"))),
        vec![review.as_str()]
    );
}

/// Verify search is case-insensitive and excludes non-matching nodes.
#[test]
fn test_search_correctness() {
    let dir = tempfile::tempdir().unwrap();
    let store = build_review(&dir.path().join("kg.json"));

    assert_eq!(ids(&store.search("cart")), vec!["A"]);
    assert_eq!(ids(&store.search("CART")), vec!["A"]);
    assert_eq!(ids(&store.search("120")), vec!["A"]);
    assert_eq!(ids(&store.search("6.5")), vec!["B"]);
    assert_eq!(ids(&store.search("martin")), vec!["C"]);
    assert!(store.search("kubernetes").is_empty());
}

/// Verify a failed edge insert leaves file and memory unchanged.
#[test]
fn test_referential_integrity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.json");
    let store = build_review(&path);
    let before = store.get_all();

    for (source, target) in [("A", "Z"), ("Z", "A"), ("Y", "Z")] {
        let result = store.add_edge(source, target, "links", EdgeOptions::bidirectional());
        assert!(matches!(result, Err(Error::ReferentialIntegrity { .. })));
    }

    assert_eq!(store.get_all(), before);
    assert_eq!(GraphStore::open_path(&path).get_all(), before);
}

/// Verify clear twice leaves an empty store and no file.
#[test]
fn test_idempotent_clear() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.json");
    let store = build_review(&path);

    store.clear();
    store.clear();
    assert!(store.get_all().nodes.is_empty());
    assert!(store.get_all().edges.is_empty());
    assert!(!path.exists());
    assert!(GraphStore::open_path(&path).get_all().nodes.is_empty());
}

/// Verify an unparseable file yields an empty store that still works.
#[test]
fn test_corrupt_file_resilience() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.json");
    std::fs::write(&path, "this is not json").unwrap();

    let store = GraphStore::open_path(&path);
    assert!(store.get_all().nodes.is_empty());

    store.add_node("A", "CodeSnippet", Properties::new()).unwrap();
    assert!(store.get_node("A").is_some());
    assert!(GraphStore::open_path(&path).get_node("A").is_some());
}

/// Verify edges to nodes missing from a hand-edited file are dropped on load.
#[test]
fn test_dangling_edges_dropped_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.json");
    std::fs::write(
        &path,
        serde_json::to_string_pretty(&json!({
            "nodes": {
                "A": {"type": "CodeSnippet", "created_at": "2024-03-01T10:00:00Z", "properties": {}},
                "B": {"type": "CodeReview", "created_at": "2024-03-01T10:01:00Z", "properties": {}}
            },
            "edges": [
                {"source": "B", "target": "A", "type": "reviews", "created_at": "2024-03-01T10:02:00Z", "properties": {}},
                {"source": "C", "target": "B", "type": "authored", "created_at": "2024-03-01T10:03:00Z", "properties": {}}
            ]
        }))
        .unwrap(),
    )
    .unwrap();

    let store = GraphStore::open_path(&path);
    assert_eq!(store.stats().node_count, 2);
    assert_eq!(store.get_edges(None).len(), 1);
    assert_eq!(ids(&store.get_related("B", None)), vec!["A"]);
}

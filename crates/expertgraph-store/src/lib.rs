//! ExpertGraph Store — embedded knowledge graph with JSON snapshot persistence.

pub mod graph;
pub mod persist;
pub mod store;
pub mod tools;
pub mod types;

pub use graph::GraphBackend;
pub use store::GraphStore;
pub use types::*;

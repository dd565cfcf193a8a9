//! Error types for ExpertGraph.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// An edge named an endpoint that is not a node in the store.
    #[error("Cannot create edge between non-existent nodes: {from} -> {to} (missing: {missing})")]
    ReferentialIntegrity {
        from: String,
        to: String,
        missing: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

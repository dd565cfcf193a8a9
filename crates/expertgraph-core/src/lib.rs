//! ExpertGraph Core — error type and store configuration.

pub mod config;
pub mod error;

pub use config::{GraphConfig, IdScheme, DEFAULT_GRAPH_PATH};
pub use error::{Error, Result};

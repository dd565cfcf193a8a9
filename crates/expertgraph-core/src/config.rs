//! Store configuration and environment loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Backing file used when `KNOWLEDGE_GRAPH_PATH` is not set.
pub const DEFAULT_GRAPH_PATH: &str = "data/knowledge_graph.json";

/// How node identifiers are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// The caller-supplied name is the key. Re-adding a name overwrites the node.
    #[default]
    Name,
    /// Every node gets a fresh UUID v4 id; the name is only a label.
    Uuid,
}

impl fmt::Display for IdScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Uuid => write!(f, "uuid"),
        }
    }
}

impl FromStr for IdScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "uuid" => Ok(Self::Uuid),
            other => Err(Error::Config(format!(
                "unknown id scheme '{}', expected 'name' or 'uuid'",
                other
            ))),
        }
    }
}

/// Configuration for a graph store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// JSON snapshot file. `None` keeps the graph in memory only.
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub id_scheme: IdScheme,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from(DEFAULT_GRAPH_PATH)),
            id_scheme: IdScheme::Name,
        }
    }
}

impl GraphConfig {
    /// File-backed configuration with the default identity scheme.
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            id_scheme: IdScheme::Name,
        }
    }

    /// Configuration without a backing file.
    pub fn in_memory(id_scheme: IdScheme) -> Self {
        Self {
            path: None,
            id_scheme,
        }
    }

    /// Create configuration from environment and defaults.
    ///
    /// Reads `KNOWLEDGE_GRAPH_PATH` and `KNOWLEDGE_GRAPH_ID_SCHEME`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("KNOWLEDGE_GRAPH_PATH").ok(),
            std::env::var("KNOWLEDGE_GRAPH_ID_SCHEME").ok(),
        )
    }

    fn from_vars(path: Option<String>, id_scheme: Option<String>) -> Result<Self> {
        let path = path
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GRAPH_PATH));

        let id_scheme = match id_scheme {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => IdScheme::default(),
        };

        Ok(Self {
            path: Some(path),
            id_scheme,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = GraphConfig::from_vars(None, None).unwrap();
        assert_eq!(config.path, Some(PathBuf::from(DEFAULT_GRAPH_PATH)));
        assert_eq!(config.id_scheme, IdScheme::Name);
    }

    #[test]
    fn test_vars_override_defaults() {
        let config =
            GraphConfig::from_vars(Some("/tmp/kg.json".into()), Some("UUID".into())).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/tmp/kg.json")));
        assert_eq!(config.id_scheme, IdScheme::Uuid);
    }

    #[test]
    fn test_invalid_scheme_is_config_error() {
        let result = GraphConfig::from_vars(None, Some("serial".into()));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_scheme_serde_is_lowercase() {
        let json = serde_json::to_string(&IdScheme::Uuid).unwrap();
        assert_eq!(json, "\"uuid\"");
        let config: GraphConfig = serde_json::from_str(r#"{"path": null}"#).unwrap();
        assert_eq!(config, GraphConfig::in_memory(IdScheme::Name));
    }
}

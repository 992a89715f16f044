//! Graph backend configuration

use crate::{GraphError, GraphStore, Neo4jGraph, SqliteGraph};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Which backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    /// Embedded SQLite file
    #[default]
    Sqlite,
    /// Neo4j server over Bolt
    Neo4j,
}

impl FromStr for GraphBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(GraphBackend::Sqlite),
            "neo4j" => Ok(GraphBackend::Neo4j),
            other => Err(format!("unknown graph backend '{}' (expected sqlite or neo4j)", other)),
        }
    }
}

impl fmt::Display for GraphBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphBackend::Sqlite => f.write_str("sqlite"),
            GraphBackend::Neo4j => f.write_str("neo4j"),
        }
    }
}

/// Graph section of the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Backend selection
    pub backend: GraphBackend,
    /// SQLite database file
    pub sqlite_path: PathBuf,
    /// Bolt URI
    pub neo4j_uri: String,
    /// Neo4j user
    pub neo4j_user: String,
    /// Environment variable holding the Neo4j password
    pub neo4j_password_env: String,
    /// Label entities with their type (Neo4j only)
    pub dynamic_labels: bool,
}

impl GraphConfig {
    /// Neo4j password from the environment
    pub fn neo4j_password(&self) -> Option<String> {
        env::var(&self.neo4j_password_env)
            .ok()
            .filter(|p| !p.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.backend {
            GraphBackend::Sqlite if self.sqlite_path.as_os_str().is_empty() => {
                Err("graph.sqlite_path must be set for the sqlite backend".to_string())
            }
            GraphBackend::Neo4j if self.neo4j_uri.trim().is_empty() => {
                Err("graph.neo4j_uri must be set for the neo4j backend".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::Sqlite,
            sqlite_path: PathBuf::from("data/papergraph.db"),
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password_env: "NEO4J_PASSWORD".to_string(),
            dynamic_labels: false,
        }
    }
}

/// Open the configured backend
pub async fn connect(config: &GraphConfig) -> Result<Arc<dyn GraphStore>, GraphError> {
    match config.backend {
        GraphBackend::Sqlite => Ok(Arc::new(SqliteGraph::open(&config.sqlite_path)?)),
        GraphBackend::Neo4j => {
            let password = config.neo4j_password().ok_or_else(|| {
                GraphError::Connection(format!(
                    "set {} to the Neo4j password",
                    config.neo4j_password_env
                ))
            })?;
            let graph = Neo4jGraph::connect(&config.neo4j_uri, &config.neo4j_user, &password)
                .await?
                .with_dynamic_labels(config.dynamic_labels);
            Ok(Arc::new(graph))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sqlite() {
        let config = GraphConfig::default();
        assert_eq!(config.backend, GraphBackend::Sqlite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Neo4j".parse::<GraphBackend>(), Ok(GraphBackend::Neo4j));
        assert!("postgres".parse::<GraphBackend>().is_err());
    }

    #[test]
    fn test_missing_sqlite_path_is_invalid() {
        let config = GraphConfig {
            sqlite_path: PathBuf::new(),
            ..GraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_neo4j_without_password_fails_to_connect() {
        let config = GraphConfig {
            backend: GraphBackend::Neo4j,
            neo4j_password_env: "PAPERGRAPH_TEST_PASSWORD_THAT_IS_NEVER_SET".to_string(),
            ..GraphConfig::default()
        };
        let err = connect(&config).await.err().unwrap();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_connect_sqlite() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = GraphConfig {
            sqlite_path: dir.path().join("graph.db"),
            ..GraphConfig::default()
        };
        let graph = connect(&config).await.unwrap();
        assert_eq!(graph.backend(), "sqlite");
        assert!(graph.counts().await.unwrap().is_empty());
    }
}

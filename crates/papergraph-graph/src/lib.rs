//! Papergraph Graph Layer
//!
//! The property graph that ingestion writes and the query translator reads.
//!
//! # Schema
//!
//! ```text
//! (:Paper {key, title, date, category, impact, enhancement, link})
//! (:Entity {name, type, last_source})
//! (:Paper)-[:MENTIONS]->(:Entity)
//! (:Entity)-[:RELATION {type, fact, evidence, evidence_count}]->(:Entity)
//! ```
//!
//! Every write is a merge by key, so replaying the same input never
//! duplicates a node or an edge.
//!
//! # Backends
//!
//! - `SqliteGraph`: embedded, the default; ad hoc queries are SQL
//! - `Neo4jGraph`: Neo4j over Bolt; ad hoc queries are Cypher
//!
//! # Examples
//!
//! ```no_run
//! use papergraph_domain::{PaperNode, SourceRecord};
//! use papergraph_graph::{GraphStore, SqliteGraph};
//!
//! # async fn example() -> Result<(), papergraph_graph::GraphError> {
//! let graph = SqliteGraph::open(":memory:")?;
//! graph.ensure_schema().await?;
//! graph.merge_paper(&PaperNode::from(&SourceRecord::new("Attention Is All You Need"))).await?;
//! assert_eq!(graph.counts().await?.papers, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod neo4j;
pub mod sqlite;

use async_trait::async_trait;
use papergraph_domain::{EntityKey, GraphCounts, PaperNode, RelationEdge};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use config::{connect, GraphBackend, GraphConfig};
pub use neo4j::Neo4jGraph;
pub use sqlite::SqliteGraph;

/// Node labels of the Cypher schema
pub const NODE_LABELS: [&str; 2] = ["Paper", "Entity"];

/// Relationship types of the Cypher schema
pub const RELATIONSHIP_TYPES: [&str; 2] = ["MENTIONS", "RELATION"];

/// Tables of the SQL schema
pub const SQL_TABLES: [&str; 5] = [
    "papers",
    "entities",
    "mentions",
    "relations",
    "relation_evidence",
];

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The store is unreachable or refused the session
    #[error("Graph connection error: {0}")]
    Connection(String),

    /// The store rejected a write
    #[error("Graph write failed during {operation}: {message}")]
    Write {
        /// The write being performed (`merge_paper`, `merge_relation`, ...)
        operation: &'static str,
        /// Detail from the backend
        message: String,
    },

    /// An ad hoc query failed to execute
    #[error("Query failed: {0}")]
    Query(String),

    /// An ad hoc query was refused before execution
    #[error("Query rejected: {0}")]
    Rejected(String),
}

impl GraphError {
    pub(crate) fn write(operation: &'static str, message: impl ToString) -> Self {
        GraphError::Write {
            operation,
            message: message.to_string(),
        }
    }

    /// True for connection failures; nothing later in the run can succeed
    pub fn is_connection(&self) -> bool {
        matches!(self, GraphError::Connection(_))
    }
}

/// Ad hoc query language of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLanguage {
    /// Neo4j Cypher
    Cypher,
    /// SQLite SQL
    Sql,
}

impl QueryLanguage {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            QueryLanguage::Cypher => "Cypher",
            QueryLanguage::Sql => "SQLite SQL",
        }
    }
}

impl fmt::Display for QueryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rows returned by an ad hoc query, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    /// Column names
    pub columns: Vec<String>,
    /// Row values, one entry per column
    pub rows: Vec<Vec<Value>>,
    /// True when more rows existed than were returned
    pub truncated: bool,
}

impl QueryRows {
    /// Number of returned rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no row was returned
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                Value::Object(
                    self.columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect(),
                )
            })
            .collect()
    }
}

/// A property-graph backend with merge-style writes.
///
/// Edges require both endpoints to exist; callers merge nodes first.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Backend name (`sqlite`, `neo4j`)
    fn backend(&self) -> &'static str;

    /// Create tables / constraints if missing
    async fn ensure_schema(&self) -> Result<(), GraphError>;

    /// Delete every Paper and Entity node and their edges
    async fn clear(&self) -> Result<(), GraphError>;

    /// Upsert a Paper node by key, overwriting its properties
    async fn merge_paper(&self, paper: &PaperNode) -> Result<(), GraphError>;

    /// Upsert an Entity node by (name, type), setting `last_source`
    async fn merge_entity(&self, entity: &EntityKey, last_source: &str) -> Result<(), GraphError>;

    /// Create the Paper→Entity MENTIONS edge if absent
    async fn merge_mention(&self, paper_key: &str, entity: &EntityKey) -> Result<(), GraphError>;

    /// Create the Entity→Entity RELATION edge if absent and record the
    /// asserting paper as evidence
    async fn merge_relation(&self, relation: &RelationEdge) -> Result<(), GraphError>;

    /// Node and edge counts
    async fn counts(&self) -> Result<GraphCounts, GraphError>;

    /// Execute a read-only ad hoc query, returning at most `max_rows` rows
    async fn run_read_query(&self, query: &str, max_rows: usize) -> Result<QueryRows, GraphError>;

    /// Schema description for query generation prompts
    fn describe_schema(&self) -> String;

    /// Language accepted by `run_read_query`
    fn query_language(&self) -> QueryLanguage;

    /// Whether entities also get a label matching their type
    fn supports_dynamic_labels(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_to_json_keeps_columns() {
        let rows = QueryRows {
            columns: vec!["title".to_string(), "date".to_string()],
            rows: vec![vec![json!("Paper A"), json!("2026-02-16")]],
            truncated: false,
        };
        assert_eq!(rows.to_json(), vec![json!({"title": "Paper A", "date": "2026-02-16"})]);
    }

    #[test]
    fn test_error_display() {
        let err = GraphError::write("merge_paper", "disk full");
        assert_eq!(err.to_string(), "Graph write failed during merge_paper: disk full");
        assert!(!err.is_connection());
        assert!(GraphError::Connection("refused".into()).is_connection());
    }
}

//! Embedded SQLite backend

use crate::{GraphError, GraphStore, QueryLanguage, QueryRows};
use async_trait::async_trait;
use papergraph_domain::{EntityKey, GraphCounts, PaperNode, RelationEdge};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Property graph stored in SQLite tables.
///
/// Use `:memory:` for an in-memory graph (useful for testing). The
/// connection is guarded by a mutex that is never held across an await.
pub struct SqliteGraph {
    conn: Mutex<Connection>,
}

impl SqliteGraph {
    /// Open (or create) a graph database and initialize the schema
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use papergraph_graph::SqliteGraph;
    ///
    /// let graph = SqliteGraph::open("data/papergraph.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if path != Path::new(":memory:") {
                std::fs::create_dir_all(parent)
                    .map_err(|e| GraphError::Connection(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| GraphError::Connection(format!("{}: {}", path.display(), e)))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Self {
            conn: Mutex::new(conn),
        };
        graph.initialize_schema()?;
        Ok(graph)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<(), GraphError> {
        let schema = include_str!("schema.sql");
        self.lock()
            .execute_batch(schema)
            .map_err(|e| GraphError::write("ensure_schema", e))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entity_id(conn: &Connection, entity: &EntityKey) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM entities WHERE name = ?1 AND type = ?2",
            params![&entity.name, entity.entity_type.as_str()],
            |row| row.get(0),
        )
        .optional()
    }

    fn require_entity(
        conn: &Connection,
        entity: &EntityKey,
        operation: &'static str,
    ) -> Result<i64, GraphError> {
        Self::entity_id(conn, entity)
            .map_err(|e| GraphError::write(operation, e))?
            .ok_or_else(|| {
                GraphError::write(
                    operation,
                    format!("entity {} ({}) does not exist", entity.name, entity.entity_type),
                )
            })
    }

    fn count(conn: &Connection, table: &str) -> Result<usize, GraphError> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| GraphError::Query(e.to_string()))
    }

    fn read_rows(conn: &Connection, query: &str, max_rows: usize) -> rusqlite::Result<QueryRows> {
        let mut stmt = conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut result = QueryRows {
            columns,
            rows: Vec::new(),
            truncated: false,
        };

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            if result.rows.len() == max_rows {
                result.truncated = true;
                break;
            }
            let values = (0..width)
                .map(|i| row.get_ref(i).map(value_to_json))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            result.rows.push(values);
        }

        Ok(result)
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

#[async_trait]
impl GraphStore for SqliteGraph {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_schema(&self) -> Result<(), GraphError> {
        self.initialize_schema()
    }

    async fn clear(&self) -> Result<(), GraphError> {
        self.lock()
            .execute_batch(
                "BEGIN;
                 DELETE FROM relation_evidence;
                 DELETE FROM relations;
                 DELETE FROM mentions;
                 DELETE FROM entities;
                 DELETE FROM papers;
                 COMMIT;",
            )
            .map_err(|e| GraphError::write("clear", e))?;
        debug!("Cleared sqlite graph");
        Ok(())
    }

    async fn merge_paper(&self, paper: &PaperNode) -> Result<(), GraphError> {
        self.lock()
            .execute(
                "INSERT INTO papers (key, title, date, category, impact, enhancement, link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(key) DO UPDATE SET
                 title = excluded.title, date = excluded.date, category = excluded.category,
                 impact = excluded.impact, enhancement = excluded.enhancement, link = excluded.link",
                params![
                    &paper.key,
                    &paper.title,
                    &paper.date,
                    &paper.category,
                    &paper.impact,
                    &paper.enhancement,
                    &paper.link,
                ],
            )
            .map_err(|e| GraphError::write("merge_paper", e))?;
        Ok(())
    }

    async fn merge_entity(&self, entity: &EntityKey, last_source: &str) -> Result<(), GraphError> {
        self.lock()
            .execute(
                "INSERT INTO entities (name, type, last_source) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name, type) DO UPDATE SET last_source = excluded.last_source",
                params![&entity.name, entity.entity_type.as_str(), last_source],
            )
            .map_err(|e| GraphError::write("merge_entity", e))?;
        Ok(())
    }

    async fn merge_mention(&self, paper_key: &str, entity: &EntityKey) -> Result<(), GraphError> {
        let conn = self.lock();
        let entity_id = Self::require_entity(&conn, entity, "merge_mention")?;
        conn.execute(
            "INSERT OR IGNORE INTO mentions (paper_key, entity_id) VALUES (?1, ?2)",
            params![paper_key, entity_id],
        )
        .map_err(|e| GraphError::write("merge_mention", e))?;
        Ok(())
    }

    async fn merge_relation(&self, relation: &RelationEdge) -> Result<(), GraphError> {
        let mut conn = self.lock();
        let source_id = Self::require_entity(&conn, &relation.source, "merge_relation")?;
        let target_id = Self::require_entity(&conn, &relation.target, "merge_relation")?;
        let kind = relation.relation.as_str();

        let tx = conn
            .transaction()
            .map_err(|e| GraphError::write("merge_relation", e))?;
        tx.execute(
            "INSERT INTO relations (source_id, target_id, type, fact) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(source_id, target_id, type) DO UPDATE SET
             fact = COALESCE(excluded.fact, relations.fact)",
            params![source_id, target_id, kind, &relation.fact],
        )
        .and_then(|_| {
            tx.execute(
                "INSERT OR IGNORE INTO relation_evidence (source_id, target_id, type, paper_key)
                 VALUES (?1, ?2, ?3, ?4)",
                params![source_id, target_id, kind, &relation.paper_key],
            )
        })
        .and_then(|_| {
            tx.execute(
                "UPDATE relations SET evidence_count = (
                     SELECT COUNT(*) FROM relation_evidence
                     WHERE source_id = ?1 AND target_id = ?2 AND type = ?3)
                 WHERE source_id = ?1 AND target_id = ?2 AND type = ?3",
                params![source_id, target_id, kind],
            )
        })
        .map_err(|e| GraphError::write("merge_relation", e))?;
        tx.commit().map_err(|e| GraphError::write("merge_relation", e))?;
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let conn = self.lock();
        Ok(GraphCounts {
            papers: Self::count(&conn, "papers")?,
            entities: Self::count(&conn, "entities")?,
            mentions: Self::count(&conn, "mentions")?,
            relations: Self::count(&conn, "relations")?,
        })
    }

    async fn run_read_query(&self, query: &str, max_rows: usize) -> Result<QueryRows, GraphError> {
        let conn = self.lock();
        conn.pragma_update(None, "query_only", true)
            .map_err(|e| GraphError::Query(e.to_string()))?;

        let result = Self::read_rows(&conn, query, max_rows);

        conn.pragma_update(None, "query_only", false)
            .map_err(|e| GraphError::Query(e.to_string()))?;

        result.map_err(|e| match e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ReadOnly =>
            {
                GraphError::Rejected("query attempted to write".to_string())
            }
            rusqlite::Error::MultipleStatement => {
                GraphError::Rejected("only a single statement is allowed".to_string())
            }
            other => GraphError::Query(other.to_string()),
        })
    }

    fn describe_schema(&self) -> String {
        SQL_SCHEMA_DESCRIPTION.to_string()
    }

    fn query_language(&self) -> QueryLanguage {
        QueryLanguage::Sql
    }

    fn supports_dynamic_labels(&self) -> bool {
        false
    }
}

const SQL_SCHEMA_DESCRIPTION: &str = "\
TABLES:
  papers(key TEXT PRIMARY KEY, title, date 'YYYY-MM-DD' or '', category, impact, enhancement, link)
  entities(id INTEGER PRIMARY KEY, name, type, last_source)
    type is one of AI_Model, Technology, Technique, Organization, Industry, Concept, Metric, Tool, Dataset
  mentions(paper_key -> papers.key, entity_id -> entities.id)        -- Paper MENTIONS Entity
  relations(source_id -> entities.id, target_id -> entities.id, type, fact, evidence_count)
    type is one of USES, UTILIZES, ENABLES, ENHANCES, IMPROVES, APPLICABLE_IN, DEVELOPED_BY,
    BASED_ON, PART_OF, COMPETES_WITH, OUTPERFORMS, EVALUATED_ON, INTEGRATES_WITH, RELATED_TO
  relation_evidence(source_id, target_id, type, paper_key)          -- papers asserting a relation";

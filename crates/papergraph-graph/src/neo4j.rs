//! Neo4j backend over Bolt

use crate::{GraphError, GraphStore, QueryLanguage, QueryRows};
use async_trait::async_trait;
use neo4rs::{query, Graph, Query};
use papergraph_domain::{EntityKey, EntityType, GraphCounts, PaperNode, RelationEdge};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Property graph in a Neo4j database
pub struct Neo4jGraph {
    graph: Graph,
    dynamic_labels: bool,
}

impl Neo4jGraph {
    /// Connect to a Neo4j server
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphError> {
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| GraphError::Connection(format!("{}: {}", uri, e)))?;

        // Fail now rather than on the first write
        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| GraphError::Connection(format!("{}: {}", uri, e)))?;

        info!("Connected to {}", uri);
        Ok(Self {
            graph,
            dynamic_labels: false,
        })
    }

    /// Also label each entity with its type (closed types only)
    pub fn with_dynamic_labels(mut self, enabled: bool) -> Self {
        self.dynamic_labels = enabled;
        self
    }

    async fn write(&self, operation: &'static str, q: Query) -> Result<(), GraphError> {
        self.graph.run(q).await.map_err(|e| classify(operation, e))
    }
}

/// Transport failures abort a run; anything else is a rejected write
fn classify(operation: &'static str, error: neo4rs::Error) -> GraphError {
    match error {
        neo4rs::Error::IOError { .. }
        | neo4rs::Error::ConnectionError
        | neo4rs::Error::AuthenticationError(_) => GraphError::Connection(error.to_string()),
        other => GraphError::write(operation, other),
    }
}

/// Extra label for an entity type; `Other` types never produce one
fn type_label(entity_type: &EntityType) -> Option<&'static str> {
    entity_type.label()
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    async fn ensure_schema(&self) -> Result<(), GraphError> {
        for statement in [
            "CREATE CONSTRAINT paper_key IF NOT EXISTS FOR (p:Paper) REQUIRE p.key IS UNIQUE",
            "CREATE CONSTRAINT entity_name_type IF NOT EXISTS FOR (e:Entity) REQUIRE (e.name, e.type) IS UNIQUE",
            "CREATE INDEX paper_date IF NOT EXISTS FOR (p:Paper) ON (p.date)",
        ] {
            self.write("ensure_schema", query(statement)).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), GraphError> {
        self.write("clear", query("MATCH (n) WHERE n:Paper OR n:Entity DETACH DELETE n"))
            .await?;
        debug!("Cleared neo4j graph");
        Ok(())
    }

    async fn merge_paper(&self, paper: &PaperNode) -> Result<(), GraphError> {
        let q = query(
            "MERGE (p:Paper {key: $key})
             SET p.title = $title,
                 p.date = CASE WHEN $date = '' THEN null ELSE date($date) END,
                 p.category = $category,
                 p.impact = $impact,
                 p.enhancement = $enhancement,
                 p.link = $link",
        )
        .param("key", paper.key.as_str())
        .param("title", paper.title.as_str())
        .param("date", paper.date.as_str())
        .param("category", paper.category.as_str())
        .param("impact", paper.impact.as_str())
        .param("enhancement", paper.enhancement.as_str())
        .param("link", paper.link.as_str());

        self.write("merge_paper", q).await
    }

    async fn merge_entity(&self, entity: &EntityKey, last_source: &str) -> Result<(), GraphError> {
        let label = if self.dynamic_labels {
            type_label(&entity.entity_type)
        } else {
            None
        };

        let statement = match label {
            Some(label) => format!(
                "MERGE (e:Entity {{name: $name, type: $type}}) SET e.last_source = $last_source, e:{}",
                label
            ),
            None => "MERGE (e:Entity {name: $name, type: $type}) SET e.last_source = $last_source"
                .to_string(),
        };

        let q = query(&statement)
            .param("name", entity.name.as_str())
            .param("type", entity.entity_type.as_str())
            .param("last_source", last_source);

        self.write("merge_entity", q).await
    }

    async fn merge_mention(&self, paper_key: &str, entity: &EntityKey) -> Result<(), GraphError> {
        let q = query(
            "MATCH (p:Paper {key: $paper_key})
             MATCH (e:Entity {name: $name, type: $type})
             MERGE (p)-[:MENTIONS]->(e)
             RETURN count(*) AS linked",
        )
        .param("paper_key", paper_key)
        .param("name", entity.name.as_str())
        .param("type", entity.entity_type.as_str());

        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| classify("merge_mention", e))?;
        let linked = match stream.next().await.map_err(|e| classify("merge_mention", e))? {
            Some(row) => row.get::<i64>("linked").unwrap_or(0),
            None => 0,
        };
        while stream
            .next()
            .await
            .map_err(|e| classify("merge_mention", e))?
            .is_some()
        {}

        if linked == 0 {
            return Err(GraphError::write(
                "merge_mention",
                format!("paper {} or entity {} does not exist", paper_key, entity.name),
            ));
        }
        Ok(())
    }

    async fn merge_relation(&self, relation: &RelationEdge) -> Result<(), GraphError> {
        let q = query(
            "MATCH (a:Entity {name: $source, type: $source_type})
             MATCH (b:Entity {name: $target, type: $target_type})
             MERGE (a)-[r:RELATION {type: $relation}]->(b)
             SET r.fact = CASE WHEN $fact = '' THEN r.fact ELSE $fact END,
                 r.evidence = CASE
                     WHEN $paper_key IN coalesce(r.evidence, []) THEN r.evidence
                     ELSE coalesce(r.evidence, []) + $paper_key
                 END
             SET r.evidence_count = size(r.evidence)
             RETURN count(r) AS merged",
        )
        .param("source", relation.source.name.as_str())
        .param("source_type", relation.source.entity_type.as_str())
        .param("target", relation.target.name.as_str())
        .param("target_type", relation.target.entity_type.as_str())
        .param("relation", relation.relation.as_str())
        .param("fact", relation.fact.clone().unwrap_or_default())
        .param("paper_key", relation.paper_key.as_str());

        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| classify("merge_relation", e))?;
        let merged = match stream.next().await.map_err(|e| classify("merge_relation", e))? {
            Some(row) => row.get::<i64>("merged").unwrap_or(0),
            None => 0,
        };
        while stream
            .next()
            .await
            .map_err(|e| classify("merge_relation", e))?
            .is_some()
        {}

        if merged == 0 {
            return Err(GraphError::write(
                "merge_relation",
                format!(
                    "endpoint {} or {} does not exist",
                    relation.source.name, relation.target.name
                ),
            ));
        }
        Ok(())
    }

    async fn counts(&self) -> Result<GraphCounts, GraphError> {
        let q = query(
            "CALL { MATCH (p:Paper) RETURN count(p) AS papers }
             CALL { MATCH (e:Entity) RETURN count(e) AS entities }
             CALL { MATCH (:Paper)-[m:MENTIONS]->(:Entity) RETURN count(m) AS mentions }
             CALL { MATCH (:Entity)-[r:RELATION]->(:Entity) RETURN count(r) AS relations }
             RETURN papers, entities, mentions, relations",
        );

        let mut stream = self
            .graph
            .execute(q)
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;
        let row = stream
            .next()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?
            .ok_or_else(|| GraphError::Query("count query returned no row".to_string()))?;

        let get = |column: &str| row.get::<i64>(column).map(|n| n as usize).unwrap_or(0);
        Ok(GraphCounts {
            papers: get("papers"),
            entities: get("entities"),
            mentions: get("mentions"),
            relations: get("relations"),
        })
    }

    async fn run_read_query(&self, cypher: &str, max_rows: usize) -> Result<QueryRows, GraphError> {
        let mut stream = self
            .graph
            .execute(query(cypher))
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;

        let mut result = QueryRows::default();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?
        {
            if result.rows.len() == max_rows {
                result.truncated = true;
                break;
            }

            let record: BTreeMap<String, Value> = row
                .to()
                .map_err(|e| GraphError::Query(format!("unsupported result value: {}", e)))?;
            if result.columns.is_empty() {
                result.columns = record.keys().cloned().collect();
            }
            result.rows.push(
                result
                    .columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect(),
            );
        }

        Ok(result)
    }

    fn describe_schema(&self) -> String {
        let mut schema = CYPHER_SCHEMA_DESCRIPTION.to_string();
        if self.dynamic_labels {
            schema.push_str(
                "\n  Entities of a known type also carry it as a label, e.g. (:Entity:AI_Model)",
            );
        }
        schema
    }

    fn query_language(&self) -> QueryLanguage {
        QueryLanguage::Cypher
    }

    fn supports_dynamic_labels(&self) -> bool {
        self.dynamic_labels
    }
}

const CYPHER_SCHEMA_DESCRIPTION: &str = "\
SCHEMA:
  (:Paper {key, title, date, category, impact, enhancement, link})
  (:Entity {name, type, last_source})
    type is one of AI_Model, Technology, Technique, Organization, Industry, Concept, Metric, Tool, Dataset
  (:Paper)-[:MENTIONS]->(:Entity)
  (:Entity)-[:RELATION {type, fact, evidence, evidence_count}]->(:Entity)
    type is one of USES, UTILIZES, ENABLES, ENHANCES, IMPROVES, APPLICABLE_IN, DEVELOPED_BY,
    BASED_ON, PART_OF, COMPETES_WITH, OUTPERFORMS, EVALUATED_ON, INTEGRATES_WITH, RELATED_TO";

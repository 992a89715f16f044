//! Core ingestion loop

use crate::IngestError;
use papergraph_domain::{EntityKey, ExtractionResult, GraphCounts, PaperNode, RelationEdge};
use papergraph_extractor::ExtractionStore;
use papergraph_graph::{GraphError, GraphStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ingestion options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Delete every managed node and edge before loading
    pub clear_first: bool,
}

/// A record whose ingestion failed part-way
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFailure {
    /// Natural key of the record
    pub key: String,
    /// Operation that failed
    pub operation: &'static str,
    /// Backend message
    pub message: String,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// Results in the store
    pub records: usize,
    /// Records fully ingested
    pub ingested: usize,
    /// Records with neither entities nor relations
    pub skipped_empty: usize,
    /// Paper merges issued
    pub papers: usize,
    /// Entity merges issued
    pub entities: usize,
    /// MENTIONS merges issued
    pub mentions: usize,
    /// RELATION merges issued
    pub relations: usize,
    /// Records that failed
    pub failures: Vec<IngestFailure>,
    /// Graph counts after the run
    pub graph: GraphCounts,
}

impl IngestStats {
    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} ingested, {} empty, {} failed; graph has {} papers, {} entities, {} mentions, {} relations",
            self.records,
            self.ingested,
            self.skipped_empty,
            self.failures.len(),
            self.graph.papers,
            self.graph.entities,
            self.graph.mentions,
            self.graph.relations,
        )
    }
}

/// Writes extraction results into a graph store
pub struct Ingestor {
    graph: Arc<dyn GraphStore>,
}

#[derive(Default)]
struct RecordWrites {
    papers: usize,
    entities: usize,
    mentions: usize,
    relations: usize,
}

impl Ingestor {
    /// Create an ingestor for a graph
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Load every result of the store into the graph
    pub async fn ingest(
        &self,
        store: &ExtractionStore,
        options: IngestOptions,
    ) -> Result<IngestStats, IngestError> {
        self.graph
            .ensure_schema()
            .await
            .map_err(|source| IngestError::Setup {
                operation: "ensure_schema",
                source,
            })?;

        if options.clear_first {
            self.graph
                .clear()
                .await
                .map_err(|source| IngestError::Setup {
                    operation: "clear",
                    source,
                })?;
            info!("Cleared existing graph ({} backend)", self.graph.backend());
        }

        let mut stats = IngestStats {
            records: store.len(),
            ..Default::default()
        };

        for (i, result) in store.iter().enumerate() {
            if result.is_empty() {
                debug!("Skipping '{}': nothing extracted", result.key);
                stats.skipped_empty += 1;
                continue;
            }

            let mut writes = RecordWrites::default();
            match self.ingest_result(result, &mut writes).await {
                Ok(()) => {
                    stats.ingested += 1;
                    info!(
                        "[{}/{}] {} ({} entities, {} relations)",
                        i + 1,
                        store.len(),
                        result.source.title.trim(),
                        result.entities.len(),
                        result.relations.len()
                    );
                }
                Err((operation, source)) if source.is_connection() => {
                    return Err(IngestError::Connection {
                        key: result.key.to_string(),
                        operation,
                        source,
                    });
                }
                Err((operation, source)) => {
                    warn!("Failed to ingest '{}' during {}: {}", result.key, operation, source);
                    stats.failures.push(IngestFailure {
                        key: result.key.to_string(),
                        operation,
                        message: source.to_string(),
                    });
                }
            }

            stats.papers += writes.papers;
            stats.entities += writes.entities;
            stats.mentions += writes.mentions;
            stats.relations += writes.relations;
        }

        stats.graph = self
            .graph
            .counts()
            .await
            .map_err(|source| IngestError::Connection {
                key: String::new(),
                operation: "counts",
                source,
            })?;

        info!("{}", stats.summary());
        Ok(stats)
    }

    /// Nodes first, then the edges between them
    async fn ingest_result(
        &self,
        result: &ExtractionResult,
        writes: &mut RecordWrites,
    ) -> Result<(), (&'static str, GraphError)> {
        let paper = PaperNode::from(&result.source);
        let last_source = result.source.source_ref();

        self.graph
            .merge_paper(&paper)
            .await
            .map_err(|e| ("merge_paper", e))?;
        writes.papers += 1;

        let mut merged: HashSet<EntityKey> = HashSet::new();
        for mention in &result.entities {
            let key = EntityKey::from(mention);
            if key.name.is_empty() || !merged.insert(key.clone()) {
                continue;
            }
            self.graph
                .merge_entity(&key, last_source)
                .await
                .map_err(|e| ("merge_entity", e))?;
            writes.entities += 1;
        }

        for relation in &result.relations {
            for endpoint in [&relation.source, &relation.target] {
                let key = EntityKey::from(endpoint);
                if merged.insert(key.clone()) {
                    self.graph
                        .merge_entity(&key, last_source)
                        .await
                        .map_err(|e| ("merge_entity", e))?;
                    writes.entities += 1;
                }
            }
        }

        let mut mentioned = HashSet::new();
        for mention in &result.entities {
            let key = EntityKey::from(mention);
            if key.name.is_empty() || !mentioned.insert(key.clone()) {
                continue;
            }
            self.graph
                .merge_mention(&paper.key, &key)
                .await
                .map_err(|e| ("merge_mention", e))?;
            writes.mentions += 1;
        }

        for relation in &result.relations {
            let edge = RelationEdge::from_mention(relation, &result.key);
            self.graph
                .merge_relation(&edge)
                .await
                .map_err(|e| ("merge_relation", e))?;
            writes.relations += 1;
        }

        Ok(())
    }
}

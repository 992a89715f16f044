//! Integration tests for the SQLite graph backend

use papergraph_domain::{
    EntityKey, EntityType, GraphCounts, PaperNode, RelationEdge, RelationType, SourceRecord,
};
use papergraph_graph::{GraphStore, QueryLanguage, SqliteGraph};
use serde_json::json;

fn entity(name: &str, entity_type: EntityType) -> EntityKey {
    EntityKey {
        name: name.to_string(),
        entity_type,
    }
}

async fn write_paper(graph: &SqliteGraph) {
    let paper = PaperNode::from(&SourceRecord::new("Paper A").with_link("https://example.org/a"));
    let gpt = entity("GPT-4o", EntityType::AiModel);
    let openai = entity("OpenAI", EntityType::Organization);

    graph.merge_paper(&paper).await.unwrap();
    for e in [&gpt, &openai] {
        graph.merge_entity(e, "https://example.org/a").await.unwrap();
        graph.merge_mention(&paper.key, e).await.unwrap();
    }
    graph
        .merge_relation(&RelationEdge {
            source: gpt,
            target: openai,
            relation: RelationType::DevelopedBy,
            fact: Some("OpenAI built GPT-4o".to_string()),
            paper_key: paper.key.clone(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_one_paper_two_entities_one_relation() {
    let graph = SqliteGraph::open(":memory:").unwrap();
    write_paper(&graph).await;

    assert_eq!(
        graph.counts().await.unwrap(),
        GraphCounts {
            papers: 1,
            entities: 2,
            mentions: 2,
            relations: 1
        }
    );
}

#[tokio::test]
async fn test_replaying_writes_is_idempotent() {
    let graph = SqliteGraph::open(":memory:").unwrap();
    write_paper(&graph).await;
    let first = graph.counts().await.unwrap();
    let snapshot = graph
        .run_read_query("SELECT type, fact, evidence_count FROM relations", 10)
        .await
        .unwrap();

    write_paper(&graph).await;
    assert_eq!(graph.counts().await.unwrap(), first);
    assert_eq!(
        graph
            .run_read_query("SELECT type, fact, evidence_count FROM relations", 10)
            .await
            .unwrap(),
        snapshot
    );
}

#[tokio::test]
async fn test_same_name_different_type_is_two_nodes() {
    let graph = SqliteGraph::open(":memory:").unwrap();
    graph.merge_entity(&entity("Gemini", EntityType::AiModel), "a").await.unwrap();
    graph.merge_entity(&entity("Gemini", EntityType::Tool), "b").await.unwrap();
    graph.merge_entity(&entity("Gemini", EntityType::AiModel), "c").await.unwrap();

    let rows = graph
        .run_read_query("SELECT name, type, last_source FROM entities ORDER BY type", 10)
        .await
        .unwrap();
    assert_eq!(
        rows.to_json(),
        vec![
            json!({"name": "Gemini", "type": "AI_Model", "last_source": "c"}),
            json!({"name": "Gemini", "type": "Tool", "last_source": "b"}),
        ]
    );
}

#[tokio::test]
async fn test_evidence_counts_distinct_papers() {
    let graph = SqliteGraph::open(":memory:").unwrap();
    let a = entity("LoRA", EntityType::Technique);
    let b = entity("Llama 3", EntityType::AiModel);
    graph.merge_entity(&a, "").await.unwrap();
    graph.merge_entity(&b, "").await.unwrap();

    for paper_key in ["P1", "P2", "P1"] {
        graph
            .merge_relation(&RelationEdge {
                source: a.clone(),
                target: b.clone(),
                relation: RelationType::Enhances,
                fact: None,
                paper_key: paper_key.to_string(),
            })
            .await
            .unwrap();
    }

    let rows = graph
        .run_read_query("SELECT evidence_count FROM relations", 10)
        .await
        .unwrap();
    assert_eq!(rows.rows, vec![vec![json!(2)]]);
}

#[tokio::test]
async fn test_clear_empties_the_graph() {
    let graph = SqliteGraph::open(":memory:").unwrap();
    write_paper(&graph).await;

    graph.clear().await.unwrap();
    assert!(graph.counts().await.unwrap().is_empty());
    let evidence = graph
        .run_read_query("SELECT COUNT(*) AS n FROM relation_evidence", 1)
        .await
        .unwrap();
    assert_eq!(evidence.rows, vec![vec![json!(0)]]);
}

#[tokio::test]
async fn test_graph_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("graph.db");
    {
        let graph = SqliteGraph::open(&path).unwrap();
        write_paper(&graph).await;
    }

    let graph = SqliteGraph::open(&path).unwrap();
    assert_eq!(graph.counts().await.unwrap().relations, 1);
    assert_eq!(graph.query_language(), QueryLanguage::Sql);
    assert!(!graph.supports_dynamic_labels());
}

//! End-to-end question answering with a scripted provider and an in-memory graph

use papergraph_domain::{EntityKey, EntityType, PaperNode, RelationEdge, RelationType, SourceRecord};
use papergraph_graph::{GraphStore, SqliteGraph};
use papergraph_llm::{MockProvider, MockReply, ProviderGateway, RetryPolicy};
use papergraph_query::{Answer, ChatConfig, ChatTurn, QueryTranslator};
use serde_json::json;
use std::sync::Arc;

async fn seeded_graph() -> Arc<SqliteGraph> {
    let graph = SqliteGraph::open(":memory:").unwrap();
    let paper = PaperNode::from(&SourceRecord::new("Paper A").with_link("https://example.org/a"));
    let gpt = EntityKey {
        name: "GPT-4o".to_string(),
        entity_type: EntityType::AiModel,
    };
    let openai = EntityKey {
        name: "OpenAI".to_string(),
        entity_type: EntityType::Organization,
    };

    graph.merge_paper(&paper).await.unwrap();
    for entity in [&gpt, &openai] {
        graph.merge_entity(entity, "https://example.org/a").await.unwrap();
        graph.merge_mention(&paper.key, entity).await.unwrap();
    }
    graph
        .merge_relation(&RelationEdge {
            source: gpt,
            target: openai,
            relation: RelationType::DevelopedBy,
            fact: None,
            paper_key: paper.key.clone(),
        })
        .await
        .unwrap();

    Arc::new(graph)
}

fn translator(provider: &MockProvider, graph: Arc<SqliteGraph>) -> QueryTranslator {
    let gateway =
        ProviderGateway::new(RetryPolicy::immediate(1)).with_provider(Arc::new(provider.clone()));
    QueryTranslator::new(Arc::new(gateway), graph, ChatConfig::default())
}

#[tokio::test]
async fn test_question_is_answered_from_rows() {
    let provider = MockProvider::new("mock", "unused");
    provider.when("Query results", MockReply::text("GPT-4o is mentioned by Paper A."));
    provider.when(
        "which papers mention GPT",
        MockReply::text(
            "```sql\nSELECT p.title FROM papers p JOIN mentions m ON m.paper_key = p.key \
             JOIN entities e ON e.id = m.entity_id WHERE e.name LIKE '%GPT%'\n```",
        ),
    );
    let translator = translator(&provider, seeded_graph().await);

    let answer = translator.ask("which papers mention GPT?", &[]).await;

    match answer {
        Answer::Answered { query, rows, summary } => {
            assert!(query.starts_with("SELECT p.title"));
            assert_eq!(rows.to_json(), vec![json!({"title": "Paper A"})]);
            assert_eq!(summary, "GPT-4o is mentioned by Paper A.");
        }
        other => panic!("expected an answer, got {:?}", other),
    }
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_declined_question() {
    let provider = MockProvider::new("mock", "CANNOT_ANSWER");
    let translator = translator(&provider, seeded_graph().await);

    let answer = translator.ask("what is the weather?", &[]).await;

    assert!(matches!(answer, Answer::CannotAnswer { .. }));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_write_query_is_never_executed() {
    let provider = MockProvider::new("mock", "DELETE FROM papers");
    let graph = seeded_graph().await;
    let translator = translator(&provider, graph.clone());

    let answer = translator.ask("remove everything", &[]).await;

    match answer {
        Answer::CannotAnswer { reason } => assert!(reason.contains("rejected")),
        other => panic!("expected CannotAnswer, got {:?}", other),
    }
    assert_eq!(graph.counts().await.unwrap().papers, 1);
}

#[tokio::test]
async fn test_execution_failure_degrades() {
    let provider = MockProvider::new("mock", "SELECT no_such_column FROM papers");
    let translator = translator(&provider, seeded_graph().await);

    let answer = translator.ask("anything", &[]).await;

    match answer {
        Answer::CannotAnswer { reason } => assert!(reason.contains("Query execution failed")),
        other => panic!("expected CannotAnswer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_provider_outage_degrades() {
    let provider = MockProvider::with_default("mock", MockReply::Unavailable);
    let translator = translator(&provider, seeded_graph().await);

    let answer = translator.ask("latest papers", &[]).await;

    assert!(!answer.is_answered());
    assert!(answer.query().is_none());
}

#[tokio::test]
async fn test_empty_question_makes_no_call() {
    let provider = MockProvider::new("mock", "SELECT title FROM papers");
    let translator = translator(&provider, seeded_graph().await);

    assert!(!translator.ask("   ", &[]).await.is_answered());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_empty_result_is_still_summarized() {
    let provider = MockProvider::new("mock", "SELECT title FROM papers WHERE title = 'nothing'");
    provider.when("Query results (0 rows)", MockReply::text("No matching papers."));
    let translator = translator(&provider, seeded_graph().await);

    let answer = translator.ask("papers titled nothing", &[]).await;

    match answer {
        Answer::Answered { rows, summary, .. } => {
            assert!(rows.is_empty());
            assert_eq!(summary, "No matching papers.");
        }
        other => panic!("expected an answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_only_recent_history_is_sent() {
    let provider = MockProvider::new("mock", "SELECT title FROM papers");
    let graph = seeded_graph().await;
    let gateway =
        ProviderGateway::new(RetryPolicy::immediate(1)).with_provider(Arc::new(provider.clone()));
    let translator = QueryTranslator::new(
        Arc::new(gateway),
        graph,
        ChatConfig {
            history_turns: 1,
            ..ChatConfig::default()
        },
    );
    let history: Vec<ChatTurn> = (0..3)
        .map(|i| ChatTurn {
            question: format!("question {}", i),
            query: format!("SELECT {} FROM papers", i),
        })
        .collect();

    let query = translator.generate_query("and now?", &history).await.unwrap();

    assert_eq!(query, "SELECT title FROM papers");
    assert_eq!(provider.prompts(), vec!["and now?".to_string()]);
}

//! Question answering over the graph

use crate::prompt::{QueryPromptBuilder, CANNOT_ANSWER};
use crate::{validate_query, ChatConfig, QueryError};
use papergraph_graph::{GraphStore, QueryRows};
use papergraph_llm::{strip_code_fence, ProviderGateway};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One earlier question and the query it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The question as asked
    pub question: String,
    /// The query that answered it
    pub query: String,
}

/// Outcome of a question
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The graph answered
    Answered {
        /// Query that was executed
        query: String,
        /// Rows it returned
        rows: QueryRows,
        /// Natural-language answer
        summary: String,
    },

    /// The question could not be answered
    CannotAnswer {
        /// Human-readable reason
        reason: String,
    },
}

impl Answer {
    /// The executed query, if any
    pub fn query(&self) -> Option<&str> {
        match self {
            Answer::Answered { query, .. } => Some(query),
            Answer::CannotAnswer { .. } => None,
        }
    }

    /// True for `Answered`
    pub fn is_answered(&self) -> bool {
        matches!(self, Answer::Answered { .. })
    }
}

/// Translates questions into graph queries and answers
pub struct QueryTranslator {
    gateway: Arc<ProviderGateway>,
    graph: Arc<dyn GraphStore>,
    config: ChatConfig,
}

impl QueryTranslator {
    /// Create a translator
    pub fn new(
        gateway: Arc<ProviderGateway>,
        graph: Arc<dyn GraphStore>,
        config: ChatConfig,
    ) -> Self {
        Self {
            gateway,
            graph,
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Answer a question, degrading every failure to `CannotAnswer`.
    ///
    /// Only the last `history_turns` entries of `history` are sent.
    pub async fn ask(&self, question: &str, history: &[ChatTurn]) -> Answer {
        match self.try_ask(question, history).await {
            Ok(answer) => answer,
            Err(e) => {
                match e.query() {
                    Some(query) => warn!(
                        "Could not answer '{}' (query: {}): {}",
                        question.trim(),
                        query,
                        e
                    ),
                    None => warn!("Could not answer '{}': {}", question.trim(), e),
                }
                Answer::CannotAnswer {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Answer a question, surfacing the failure
    pub async fn try_ask(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let query = self.generate_query(question, history).await?;
        info!("Generated query: {}", query);

        let rows = self
            .graph
            .run_read_query(&query, self.config.max_rows)
            .await
            .map_err(|source| QueryError::Execution {
                query: query.clone(),
                source,
            })?;
        debug!("Query returned {} rows", rows.len());

        let summary = self.summarize(question, &rows).await?;

        Ok(Answer::Answered {
            query,
            rows,
            summary,
        })
    }

    /// Generate and validate a query for `question`
    pub async fn generate_query(
        &self,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String, QueryError> {
        let schema = self.graph.describe_schema();
        let language = self.graph.query_language();
        let recent = &history[history.len().saturating_sub(self.config.history_turns)..];

        let request = QueryPromptBuilder::new(&schema, language)
            .with_history(recent)
            .with_row_limit(self.config.row_limit)
            .query_request(question);

        let completion = self.gateway.complete(&request).await?;
        let text = strip_code_fence(&completion.text);
        if text.contains(CANNOT_ANSWER) {
            return Err(QueryError::Declined);
        }

        validate_query(text, language).map_err(|reason| QueryError::Rejected {
            query: text.to_string(),
            reason,
        })
    }

    async fn summarize(&self, question: &str, rows: &QueryRows) -> Result<String, QueryError> {
        let request = QueryPromptBuilder::answer_request(question, rows);
        let completion = self.gateway.complete(&request).await?;
        Ok(completion.text.trim().to_string())
    }
}

//! Query translator error types

use crate::RejectionReason;
use papergraph_graph::GraphError;
use papergraph_llm::ProviderError;
use thiserror::Error;

/// Reasons a question could not be answered
#[derive(Error, Debug)]
pub enum QueryError {
    /// The question was empty
    #[error("Question is empty")]
    EmptyQuestion,

    /// No provider produced a query or a summary
    #[error("LLM error: {0}")]
    Provider(#[from] ProviderError),

    /// The model declared the question out of scope
    #[error("The graph does not hold the information needed to answer this question")]
    Declined,

    /// The generated query failed validation
    #[error("Generated query rejected: {reason}")]
    Rejected {
        /// The generated query
        query: String,
        /// Why it was rejected
        reason: RejectionReason,
    },

    /// The graph failed to run the query
    #[error("Query execution failed: {source}")]
    Execution {
        /// The query that failed
        query: String,
        /// Backend error
        source: GraphError,
    },
}

impl QueryError {
    /// The generated query, when one exists
    pub fn query(&self) -> Option<&str> {
        match self {
            QueryError::Rejected { query, .. } | QueryError::Execution { query, .. } => Some(query),
            _ => None,
        }
    }
}

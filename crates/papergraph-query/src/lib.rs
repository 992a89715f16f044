//! Papergraph Query Translator
//!
//! Answers free-text questions from the graph in three steps:
//!
//! 1. the provider gateway turns the question into a query in the backend's
//!    language, guided by the backend's schema description;
//! 2. the query is validated as read-only and run against the graph;
//! 3. the gateway summarizes the returned rows.
//!
//! Nothing in this path is fatal to a chat session. A question the model
//! declines, a rejected query or a failed execution all come back as
//! [`Answer::CannotAnswer`] with a reason.
//!
//! # Examples
//!
//! ```no_run
//! use papergraph_graph::SqliteGraph;
//! use papergraph_llm::{LlmConfig, ProviderGateway};
//! use papergraph_query::{Answer, ChatConfig, QueryTranslator};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(ProviderGateway::from_config(&LlmConfig::default()));
//! let graph = Arc::new(SqliteGraph::open("data/papergraph.db")?);
//! let translator = QueryTranslator::new(gateway, graph, ChatConfig::default());
//!
//! match translator.ask("which papers mention GPT-4o?", &[]).await {
//!     Answer::Answered { summary, .. } => println!("{}", summary),
//!     Answer::CannotAnswer { reason } => println!("could not answer: {}", reason),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod prompt;
mod translator;
mod validator;

pub use config::ChatConfig;
pub use error::QueryError;
pub use prompt::{QueryPromptBuilder, CANNOT_ANSWER};
pub use translator::{Answer, ChatTurn, QueryTranslator};
pub use validator::{validate_query, RejectionReason};

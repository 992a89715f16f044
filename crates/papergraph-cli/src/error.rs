//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction error
    #[error(transparent)]
    Extractor(#[from] papergraph_extractor::ExtractorError),

    /// Graph error
    #[error(transparent)]
    Graph(#[from] papergraph_graph::GraphError),

    /// Ingestion error
    #[error(transparent)]
    Ingest(#[from] papergraph_ingest::IngestError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No LLM provider has a key configured
    #[error("No LLM provider available. Set one of: {0}")]
    NoProviders(String),
}

//! Error types for the Extractor

use papergraph_llm::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Every provider failed for a record
    #[error("LLM error: {0}")]
    Provider(#[from] ProviderError),

    /// One record's completion could not be turned into a result
    #[error("Record '{key}' could not be extracted: {reason}")]
    Record {
        /// Natural key of the record
        key: String,
        /// What went wrong
        reason: String,
    },

    /// Source file could not be read or has an unsupported shape
    #[error("Source error in {path}: {message}")]
    Source {
        /// Source path
        path: PathBuf,
        /// Detail
        message: String,
    },

    /// Cumulative store could not be read or written
    #[error("Store error in {path}: {message}")]
    Store {
        /// Store path
        path: PathBuf,
        /// Detail
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    pub(crate) fn source_file(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ExtractorError::Source {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn store_file(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ExtractorError::Store {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

//! Papergraph LLM Provider Layer
//!
//! Uniform access to interchangeable chat-completion backends with ordered
//! fallback and retry-on-rate-limit.
//!
//! # Architecture
//!
//! ```text
//! caller → ProviderGateway → [provider 1] --429 x N / auth / malformed--> [provider 2] → ...
//! ```
//!
//! Each backend implements [`CompletionProvider`]. The [`ProviderGateway`]
//! holds them in priority order, retries a rate-limited provider with
//! exponential backoff, and only fails once every provider is exhausted.
//!
//! # Providers
//!
//! - `OpenAiCompatibleProvider`: any `/chat/completions` endpoint (Groq, Gemini, ...)
//! - `MockProvider`: scripted responses for testing
//!
//! # Examples
//!
//! ```
//! use papergraph_llm::{CompletionRequest, MockProvider, ProviderGateway, RetryPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), papergraph_llm::ProviderError> {
//! let gateway = ProviderGateway::new(RetryPolicy::default())
//!     .with_provider(Arc::new(MockProvider::new("mock", "Hello from LLM!")));
//!
//! let completion = gateway.complete(&CompletionRequest::user("hi")).await?;
//! assert_eq!(completion.text, "Hello from LLM!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod gateway;
pub mod mock;
pub mod openai;
pub mod provider;

use thiserror::Error;

pub use config::{LlmConfig, ProviderConfig, RetryPolicy};
pub use gateway::{strip_code_fence, Completion, ProviderGateway, Structured};
pub use mock::{MockProvider, MockReply};
pub use openai::OpenAiCompatibleProvider;
pub use provider::{ChatMessage, CompletionProvider, CompletionRequest, ResponseFormat, Role};

/// Coarse classification of a [`ProviderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Rate limit signalled (HTTP 429)
    RateLimited,
    /// Credentials rejected
    AuthFailed,
    /// Response did not have the expected shape
    Invalid,
    /// Provider unreachable, timed out, or every provider exhausted
    Unavailable,
}

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Rate limit exceeded
    #[error("{provider}: rate limit exceeded")]
    RateLimited {
        /// Provider identifier
        provider: String,
    },

    /// Credentials missing or rejected
    #[error("{provider}: authentication failed: {message}")]
    AuthFailed {
        /// Provider identifier
        provider: String,
        /// Detail from the backend
        message: String,
    },

    /// Invalid response from LLM
    #[error("{provider}: invalid response: {message}")]
    Invalid {
        /// Provider identifier
        provider: String,
        /// What was wrong with the response
        message: String,
    },

    /// Network failure, timeout, server error, or fallback chain exhausted
    #[error("{provider}: unavailable: {message}")]
    Unavailable {
        /// Provider identifier (`gateway` once the chain is exhausted)
        provider: String,
        /// Detail
        message: String,
    },
}

impl ProviderError {
    /// The error's kind
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::RateLimited { .. } => ProviderErrorKind::RateLimited,
            ProviderError::AuthFailed { .. } => ProviderErrorKind::AuthFailed,
            ProviderError::Invalid { .. } => ProviderErrorKind::Invalid,
            ProviderError::Unavailable { .. } => ProviderErrorKind::Unavailable,
        }
    }

    /// Identifier of the provider the error came from
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::RateLimited { provider }
            | ProviderError::AuthFailed { provider, .. }
            | ProviderError::Invalid { provider, .. }
            | ProviderError::Unavailable { provider, .. } => provider,
        }
    }

    pub(crate) fn invalid(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Invalid {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(provider: &str, message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

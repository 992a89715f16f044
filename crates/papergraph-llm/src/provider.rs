//! The provider capability interface and request types

use crate::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Earlier model output
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Requested response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// A single JSON object (`response_format: {"type": "json_object"}`)
    JsonObject,
}

/// A completion request, independent of any backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Expected response shape
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Request from an explicit message list
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.0,
            response_format: ResponseFormat::Text,
        }
    }

    /// Single user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(content)])
    }

    /// System prompt followed by one user message
    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask for a JSON object response
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::JsonObject;
        self
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A text-completion backend.
///
/// Implementations perform exactly one network round trip per call and
/// classify failures into [`ProviderError`] variants; retrying and
/// falling back are the gateway's job.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stable identifier (e.g. `groq`)
    fn id(&self) -> &str;

    /// Model name sent to the backend
    fn model(&self) -> &str;

    /// Upper bound for a single call
    fn timeout(&self) -> Duration;

    /// Run one completion and return the raw message content
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = CompletionRequest::with_system("be terse", "hello")
            .temperature(0.2)
            .json();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
        assert_eq!(request.last_user_message(), Some("hello"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("x")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}

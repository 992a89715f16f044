//! OpenAI-compatible chat completion provider
//!
//! Works against any backend exposing `POST {base_url}/chat/completions`
//! with bearer authentication: Groq, Gemini's OpenAI endpoint, OpenRouter,
//! Together, local vLLM servers.

use crate::config::ProviderConfig;
use crate::provider::{CompletionProvider, CompletionRequest, ResponseFormat};
use crate::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Provider for OpenAI-compatible HTTP endpoints
pub struct OpenAiCompatibleProvider {
    id: String,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Create a provider
    ///
    /// # Examples
    ///
    /// ```
    /// use papergraph_llm::{CompletionProvider, OpenAiCompatibleProvider};
    ///
    /// let provider = OpenAiCompatibleProvider::new(
    ///     "groq",
    ///     "https://api.groq.com/openai/v1/",
    ///     "llama-3.3-70b-versatile",
    ///     "secret",
    /// );
    /// assert_eq!(provider.model(), "llama-3.3-70b-versatile");
    /// ```
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Build from a chain entry; `None` when its API key is not set
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key()?;
        Some(
            Self::new(&config.id, &config.base_url, &config.model, api_key)
                .with_timeout(config.timeout()),
        )
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });

        if request.response_format == ResponseFormat::JsonObject {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        body
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::unavailable(
                        &self.id,
                        format!("timed out after {:?}", self.timeout),
                    )
                } else {
                    ProviderError::unavailable(&self.id, format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!(provider = %self.id, %status, "provider returned an error status");

            return Err(match status {
                reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                    provider: self.id.clone(),
                },
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    ProviderError::AuthFailed {
                        provider: self.id.clone(),
                        message: format!("HTTP {}: {}", status, error_text),
                    }
                }
                reqwest::StatusCode::BAD_REQUEST | reqwest::StatusCode::UNPROCESSABLE_ENTITY => {
                    ProviderError::invalid(&self.id, format!("HTTP {}: {}", status, error_text))
                }
                _ => {
                    ProviderError::unavailable(&self.id, format!("HTTP {}: {}", status, error_text))
                }
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::invalid(&self.id, format!("failed to parse response: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::invalid(&self.id, "no choices in response"))?;

        if content.is_empty() {
            return Err(ProviderError::invalid(&self.id, "empty message content"));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new("test", server.uri(), "test-model", "sk-test")
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let provider = OpenAiCompatibleProvider::new("p", "https://host/v1/", "m", "k");
        assert_eq!(provider.base_url, "https://host/v1");
    }

    #[test]
    fn test_json_mode_in_request_body() {
        let provider = OpenAiCompatibleProvider::new("p", "https://host/v1", "m", "k");
        let body = provider.request_body(&CompletionRequest::user("x").json());
        assert_eq!(body["response_format"]["type"], "json_object");

        let body = provider.request_body(&CompletionRequest::user("x"));
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  hello  ")))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_401_is_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::AuthFailed);
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Invalid);
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Invalid);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .with_timeout(Duration::from_millis(50))
            .complete(&CompletionRequest::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let provider = OpenAiCompatibleProvider::new("down", "http://127.0.0.1:9", "m", "k");
        let err = provider.complete(&CompletionRequest::user("hi")).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
    }
}

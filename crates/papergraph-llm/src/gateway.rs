//! Ordered provider registry with retry and fallback

use crate::config::{LlmConfig, RetryPolicy};
use crate::openai::OpenAiCompatibleProvider;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::ProviderError;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// A successful completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Raw message content
    pub text: String,
    /// Identifier of the provider that answered
    pub provider: String,
}

/// A successful structured completion
#[derive(Debug, Clone, PartialEq)]
pub struct Structured<T> {
    /// The decoded value
    pub value: T,
    /// Identifier of the provider that answered
    pub provider: String,
}

/// Uniform entry point to the provider chain.
///
/// Providers are tried in registration order. A rate-limited provider is
/// retried with exponential backoff up to `RetryPolicy::max_attempts`;
/// exhausting those retries, a rejected credential, a malformed response,
/// a timeout or any other failure moves on to the next provider. Only when
/// every provider has failed does the call return
/// `ProviderError::Unavailable`. Responses are never cached.
pub struct ProviderGateway {
    providers: Vec<Arc<dyn CompletionProvider>>,
    retry: RetryPolicy,
}

impl ProviderGateway {
    /// Identifier used for errors raised by the gateway itself
    pub const ID: &'static str = "gateway";

    /// Create an empty gateway
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            providers: Vec::new(),
            retry,
        }
    }

    /// Build the chain from configuration, registering every provider whose
    /// API key is present in the environment
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut gateway = Self::new(config.retry);
        for provider_config in &config.providers {
            match OpenAiCompatibleProvider::from_config(provider_config) {
                Some(provider) => {
                    debug!(
                        provider = %provider_config.id,
                        model = %provider_config.model,
                        "registered provider"
                    );
                    gateway.register(Arc::new(provider));
                }
                None => {
                    debug!(
                        provider = %provider_config.id,
                        "skipping provider: {} is not set",
                        provider_config.api_key_env
                    );
                }
            }
        }
        gateway
    }

    /// Append a provider (lowest priority so far)
    pub fn register(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.providers.push(provider);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Registered providers, in priority order
    pub fn providers(&self) -> &[Arc<dyn CompletionProvider>] {
        &self.providers
    }

    /// Registered provider identifiers, in priority order
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// One line per registered provider: position, id and model
    pub fn describe(&self) -> String {
        if self.providers.is_empty() {
            return "  (no providers registered)".to_string();
        }
        self.providers
            .iter()
            .enumerate()
            .map(|(i, p)| format!("  {}. {} ({})", i + 1, p.id(), p.model()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The retry policy in use
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Complete a request and return the raw text
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let (text, provider) = self.run(request, |text| Ok(text.to_string())).await?;
        Ok(Completion { text, provider })
    }

    /// Complete a request and decode the response as JSON into `T`.
    ///
    /// Markdown code fences around the JSON are tolerated. A response that
    /// does not decode counts as that provider's `Invalid` failure, so the
    /// next provider gets a chance.
    pub async fn complete_structured<T>(
        &self,
        request: &CompletionRequest,
    ) -> Result<Structured<T>, ProviderError>
    where
        T: DeserializeOwned,
    {
        let (value, provider) = self
            .run(request, |text| {
                serde_json::from_str::<T>(strip_code_fence(text))
                    .map_err(|e| format!("response does not match the expected schema: {}", e))
            })
            .await?;
        Ok(Structured { value, provider })
    }

    async fn run<T, F>(
        &self,
        request: &CompletionRequest,
        parse: F,
    ) -> Result<(T, String), ProviderError>
    where
        F: Fn(&str) -> Result<T, String>,
    {
        if self.providers.is_empty() {
            return Err(ProviderError::unavailable(Self::ID, "no providers configured"));
        }

        let mut failures = Vec::new();

        for provider in &self.providers {
            let id = provider.id().to_string();
            let mut attempt = 0u32;

            loop {
                let outcome = match timeout(provider.timeout(), provider.complete(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::unavailable(
                        &id,
                        format!("timed out after {:?}", provider.timeout()),
                    )),
                };

                let parsed = outcome.and_then(|text| {
                    parse(&text).map_err(|message| ProviderError::invalid(&id, message))
                });

                match parsed {
                    Ok(value) => {
                        if !failures.is_empty() {
                            info!(provider = %id, "fallback provider succeeded");
                        }
                        return Ok((value, id));
                    }
                    Err(ProviderError::RateLimited { .. })
                        if attempt + 1 < self.retry.max_attempts =>
                    {
                        let delay = self.retry.delay_for(attempt);
                        warn!(
                            provider = %id,
                            attempt = attempt + 1,
                            "rate limited, retrying in {:?}",
                            delay
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        warn!(provider = %id, error = %e, "provider failed, trying next provider");
                        failures.push(e);
                        break;
                    }
                }
            }
        }

        let summary = failures
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ProviderError::unavailable(
            Self::ID,
            format!("all {} providers failed: {}", self.providers.len(), summary),
        ))
    }
}

/// Strip a surrounding markdown code fence (```json ... ```) if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let without_open = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return trimmed.trim_matches('`').trim(),
    };

    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockReply};
    use crate::ProviderErrorKind;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        answer: u32,
    }

    fn gateway(providers: &[&MockProvider], max_attempts: u32) -> ProviderGateway {
        providers.iter().fold(
            ProviderGateway::new(RetryPolicy::immediate(max_attempts)),
            |gateway, p| gateway.with_provider(Arc::new((*p).clone())),
        )
    }

    #[tokio::test]
    async fn test_primary_answers() {
        let primary = MockProvider::new("primary", "one");
        let secondary = MockProvider::new("secondary", "two");
        let gateway = gateway(&[&primary, &secondary], 3);

        let completion = gateway.complete(&CompletionRequest::user("q")).await.unwrap();
        assert_eq!(completion.text, "one");
        assert_eq!(completion.provider, "primary");
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_retried_on_same_provider() {
        let primary = MockProvider::new("primary", "finally");
        primary.push(MockReply::RateLimited);
        primary.push(MockReply::RateLimited);
        let secondary = MockProvider::new("secondary", "two");
        let gateway = gateway(&[&primary, &secondary], 3);

        let completion = gateway.complete(&CompletionRequest::user("q")).await.unwrap();
        assert_eq!(completion.text, "finally");
        assert_eq!(primary.call_count(), 3);
        assert_eq!(secondary.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_falls_through_to_secondary() {
        let primary = MockProvider::rate_limited("primary");
        let secondary = MockProvider::new("secondary", "two");
        let gateway = gateway(&[&primary, &secondary], 4);

        let completion = gateway.complete(&CompletionRequest::user("q")).await.unwrap();
        assert_eq!(completion.text, "two");
        assert_eq!(completion.provider, "secondary");
        assert_eq!(primary.call_count(), 4);
        assert_eq!(secondary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_advances_without_retry() {
        let primary = MockProvider::with_default("primary", MockReply::AuthFailed);
        let secondary = MockProvider::new("secondary", "two");
        let gateway = gateway(&[&primary, &secondary], 5);

        let completion = gateway.complete(&CompletionRequest::user("q")).await.unwrap();
        assert_eq!(completion.provider, "secondary");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_exhausted_is_unavailable() {
        let primary = MockProvider::rate_limited("primary");
        let secondary = MockProvider::with_default("secondary", MockReply::Unavailable);
        let gateway = gateway(&[&primary, &secondary], 2);

        let err = gateway.complete(&CompletionRequest::user("q")).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
        assert_eq!(err.provider(), ProviderGateway::ID);
        assert!(err.to_string().contains("primary: rate limit exceeded"));
        assert!(err.to_string().contains("secondary: unavailable"));
    }

    #[tokio::test]
    async fn test_empty_gateway_is_unavailable() {
        let gateway = ProviderGateway::new(RetryPolicy::default());
        let err = gateway.complete(&CompletionRequest::user("q")).await.unwrap_err();
        assert_eq!(err.kind(), ProviderErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_malformed_structured_output_falls_back() {
        let primary = MockProvider::new("primary", "I think the answer is 42");
        let secondary = MockProvider::new("secondary", "```json\n{\"answer\": 42}\n```");
        let gateway = gateway(&[&primary, &secondary], 3);

        let structured: Structured<Answer> = gateway
            .complete_structured(&CompletionRequest::user("q").json())
            .await
            .unwrap();
        assert_eq!(structured.value, Answer { answer: 42 });
        assert_eq!(structured.provider, "secondary");
        assert_eq!(primary.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_and_falls_back() {
        let primary = MockProvider::new("primary", "late")
            .with_latency(Duration::from_millis(500))
            .with_timeout(Duration::from_millis(20));
        let secondary = MockProvider::new("secondary", "fast");
        let gateway = gateway(&[&primary, &secondary], 3);

        let completion = gateway.complete(&CompletionRequest::user("q")).await.unwrap();
        assert_eq!(completion.text, "fast");
    }

    #[test]
    fn test_describe_lists_providers_in_order() {
        let gateway = ProviderGateway::new(RetryPolicy::default())
            .with_provider(Arc::new(MockProvider::new("groq", "")))
            .with_provider(Arc::new(MockProvider::new("gemini", "")));
        assert_eq!(gateway.provider_ids(), vec!["groq", "gemini"]);
        assert_eq!(gateway.describe(), "  1. groq (mock)\n  2. gemini (mock)");
    }

    #[test]
    fn test_from_config_skips_providers_without_keys() {
        let mut provider = crate::ProviderConfig::groq();
        provider.api_key_env = "PAPERGRAPH_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let config = LlmConfig {
            providers: vec![provider],
            retry: RetryPolicy::default(),
        };
        assert!(ProviderGateway::from_config(&config).is_empty());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1, 2]\n```\n"), "[1, 2]");
        assert_eq!(strip_code_fence("```MATCH (n) RETURN n```"), "MATCH (n) RETURN n");
    }
}

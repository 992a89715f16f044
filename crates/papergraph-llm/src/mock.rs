//! Scripted provider for deterministic tests

use crate::provider::{CompletionProvider, CompletionRequest};
use crate::ProviderError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One scripted outcome
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Succeed with this text
    Text(String),
    /// Fail with `RateLimited`
    RateLimited,
    /// Fail with `AuthFailed`
    AuthFailed,
    /// Fail with `Invalid`
    Invalid,
    /// Fail with `Unavailable`
    Unavailable,
}

impl MockReply {
    /// Shorthand for a text reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    fn resolve(&self, provider: &str) -> Result<String, ProviderError> {
        match self {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::RateLimited => Err(ProviderError::RateLimited {
                provider: provider.to_string(),
            }),
            MockReply::AuthFailed => Err(ProviderError::AuthFailed {
                provider: provider.to_string(),
                message: "mock auth failure".to_string(),
            }),
            MockReply::Invalid => Err(ProviderError::invalid(provider, "mock invalid response")),
            MockReply::Unavailable => Err(ProviderError::unavailable(provider, "mock outage")),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    queue: VecDeque<MockReply>,
    rules: Vec<(String, MockReply)>,
    prompts: Vec<String>,
}

/// Mock LLM provider.
///
/// Resolution order per call: the next queued reply, then the first rule
/// whose needle occurs in the last user message, then the default reply.
/// Clones share state, so a test can keep a handle after handing the
/// provider to a gateway.
///
/// # Examples
///
/// ```
/// use papergraph_llm::{CompletionProvider, CompletionRequest, MockProvider, MockReply};
///
/// # async fn example() {
/// let provider = MockProvider::new("mock", "default");
/// provider.push(MockReply::RateLimited);
/// provider.when("paper B", MockReply::text("B!"));
///
/// assert!(provider.complete(&CompletionRequest::user("paper A")).await.is_err());
/// assert_eq!(provider.complete(&CompletionRequest::user("paper B")).await.unwrap(), "B!");
/// assert_eq!(provider.complete(&CompletionRequest::user("paper A")).await.unwrap(), "default");
/// assert_eq!(provider.call_count(), 3);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    id: String,
    default_reply: MockReply,
    latency: Duration,
    timeout: Duration,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a provider that answers every prompt with `response`
    pub fn new(id: impl Into<String>, response: impl Into<String>) -> Self {
        Self::with_default(id, MockReply::Text(response.into()))
    }

    /// Create a provider whose fallback reply is `reply`
    pub fn with_default(id: impl Into<String>, reply: MockReply) -> Self {
        Self {
            id: id.into(),
            default_reply: reply,
            latency: Duration::ZERO,
            timeout: Duration::from_secs(5),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Provider that is always rate limited
    pub fn rate_limited(id: impl Into<String>) -> Self {
        Self::with_default(id, MockReply::RateLimited)
    }

    /// Delay every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Override the advertised timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queue a one-shot reply
    pub fn push(&self, reply: MockReply) {
        self.state().queue.push_back(reply);
    }

    /// Reply with `reply` whenever the last user message contains `needle`
    pub fn when(&self, needle: impl Into<String>, reply: MockReply) {
        self.state().rules.push((needle.into(), reply));
    }

    /// Number of calls so far
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Last user message of every call, in order
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let prompt = request.last_user_message().unwrap_or_default().to_string();

        let reply = {
            let mut state = self.state();
            state.prompts.push(prompt.clone());
            match state.queue.pop_front() {
                Some(reply) => reply,
                None => state
                    .rules
                    .iter()
                    .find(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| self.default_reply.clone()),
            }
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        reply.resolve(&self.id)
    }
}

//! Provider chain and retry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One entry of the provider chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in logs and errors
    pub id: String,

    /// OpenAI-compatible API base URL (without `/chat/completions`)
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Groq, the default primary provider
    pub fn groq() -> Self {
        Self {
            id: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Gemini through its OpenAI-compatible endpoint, the default fallback
    pub fn gemini() -> Self {
        Self {
            id: "gemini".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Look up the API key; empty values count as missing
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// True when a key is configured
    pub fn is_available(&self) -> bool {
        self.api_key().is_some()
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("provider id must not be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("provider '{}': base_url must be an http(s) URL", self.id));
        }
        if self.model.trim().is_empty() {
            return Err(format!("provider '{}': model must not be empty", self.id));
        }
        if self.timeout_secs == 0 {
            return Err(format!("provider '{}': timeout_secs must be greater than 0", self.id));
        }
        Ok(())
    }
}

/// Exponential backoff for rate-limited calls.
///
/// Attempt `n` (0-based) that hits a rate limit waits
/// `min(base_delay * 2^n, max_delay)` before attempt `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per provider before moving on
    pub max_attempts: u32,

    /// First backoff delay (milliseconds)
    pub base_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// No waiting between attempts (tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be greater than 0".to_string());
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err("retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 4_000,
            max_delay_ms: 64_000,
        }
    }
}

/// Provider chain plus retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Providers in priority order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Backoff for rate limits
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl LlmConfig {
    /// Validate the chain
    pub fn validate(&self) -> Result<(), String> {
        if self.providers.is_empty() {
            return Err("at least one provider must be configured".to_string());
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        let mut ids: Vec<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.providers.len() {
            return Err("provider ids must be unique".to_string());
        }
        self.retry.validate()
    }

    /// Human-readable availability listing, one provider per line
    pub fn describe(&self) -> String {
        self.providers
            .iter()
            .map(|p| {
                let status = if p.is_available() { "✔" } else { "✗" };
                format!("  {} {:12} model={} ({})", status, p.id, p.model, p.api_key_env)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig::groq(), ProviderConfig::gemini()]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

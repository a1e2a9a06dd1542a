//! Collaborator client configuration.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default OpenAI-compatible base URL (the AI Proxy gateway).
pub const DEFAULT_BASE_URL: &str = "http://aiproxy.sanand.workers.dev/openai/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Text-generation client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Bearer token. Required by [`ChatClient::new`](crate::ChatClient::new).
    pub api_token: Option<String>,

    /// Per-attempt timeout.
    pub timeout: Duration,

    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry.
    pub retry_base_delay: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl LlmConfig {
    /// Builder method to set the bearer token.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Builder method to set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_base_delay(self.retry_base_delay)
            .with_attempt_timeout(self.timeout)
    }
}

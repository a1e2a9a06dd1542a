//! OpenAI-compatible chat completions client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Something that turns a prompt into a text reply.
///
/// Replies are opaque strings; parsing them is the caller's job.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt as a single user message and return the reply text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt).await
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
///
/// Makes exactly one HTTP request per call. Wrap it in
/// [`Retrying`](crate::Retrying) for timeouts and retries.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_token: String,
}

impl ChatClient {
    /// Create a client. Fails if no API token is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_token = config
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LlmError::Config("API token is not set".to_string()))?
            .to_string();

        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_token,
        })
    }

    /// The full request URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        trace!(model = %self.model, prompt_len = prompt.len(), "Sending chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %text, "Chat completion request failed");
            return Err(LlmError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            debug!(body = %text, "Unparseable chat completion body");
            LlmError::MalformedResponse(format!(
                "body is not a chat completion ({} at line {} column {})",
                describe_json_error(&e),
                e.line(),
                e.column()
            ))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::MalformedResponse("response has no message content".to_string())
            })?;

        debug!(reply = %content, "Chat completion reply");
        Ok(content)
    }
}

/// Category of a parse failure. serde's own message quotes the input.
fn describe_json_error(err: &serde_json::Error) -> &'static str {
    use serde_json::error::Category;

    match err.classify() {
        Category::Io => "unreadable",
        Category::Syntax => "not JSON",
        Category::Data => "unexpected fields or types",
        Category::Eof => "truncated JSON",
    }
}

fn transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(err.without_url().to_string())
    }
}

//! Canned replies in place of a live model.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::client::TextGenerator;
use crate::error::LlmError;

struct Step {
    delay: Option<Duration>,
    reply: Result<String, LlmError>,
}

/// A generator that replays a fixed script of replies and errors, in order.
///
/// Every prompt it receives is recorded. Once the script runs out, calls fail
/// with [`LlmError::MalformedResponse`].
///
/// This is useful for testing.
#[derive(Default)]
pub struct ScriptedGenerator {
    steps: Mutex<VecDeque<Step>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a script that returns each reply once, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        replies
            .into_iter()
            .fold(Self::new(), |script, reply| script.reply(reply))
    }

    /// Append a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(None, Ok(text.into()))
    }

    /// Append a reply that arrives only after `delay`.
    pub fn delayed_reply(self, delay: Duration, text: impl Into<String>) -> Self {
        self.push(Some(delay), Ok(text.into()))
    }

    /// Append a failed call.
    pub fn error(self, err: LlmError) -> Self {
        self.push(None, Err(err))
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Number of scripted steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn push(self, delay: Option<Duration>, reply: Result<String, LlmError>) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(Step { delay, reply });
        self
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        let step = self
            .steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        let Some(step) = step else {
            return Err(LlmError::MalformedResponse(
                "no scripted reply left".to_string(),
            ));
        };
        if let Some(delay) = step.delay {
            tokio::time::sleep(delay).await;
        }
        trace!(reply = ?step.reply, "Scripted reply");
        step.reply
    }
}

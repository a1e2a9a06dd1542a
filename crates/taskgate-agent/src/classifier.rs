//! Task classification.

use std::fmt::Write;
use std::sync::Arc;

use tracing::debug;

use taskgate_core::{Category, TaskError, TaskRequest};
use taskgate_llm::TextGenerator;

use crate::failure::TaskFailure;

/// Maps a task description to one [`Category`] with a single model call.
///
/// The classifier itself never retries. Timeouts and transient transport
/// errors are retried by the generator it is given.
#[derive(Clone)]
pub struct TaskClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl TaskClassifier {
    /// Create a classifier using `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Classify a validated request.
    pub async fn classify(&self, request: &TaskRequest) -> Result<Category, TaskFailure> {
        let prompt = Self::prompt(request.description());

        let reply = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|err| TaskFailure::collaborator(TaskError::ClassificationFailure, err))?;

        debug!(reply = %reply, "Classifier reply");
        Self::parse_reply(&reply).map_err(TaskFailure::from)
    }

    /// Prompt embedding the full taxonomy and the description.
    pub fn prompt(description: &str) -> String {
        let mut prompt =
            String::from("Classify this task into exactly one of these categories:\n");
        for category in Category::ALL {
            let _ = writeln!(prompt, "{}: {}", category.id(), category.description());
        }
        let _ = write!(
            prompt,
            "\nTask: {description}\n\n\
             Reply with only the category identifier (for example A3 or B10) and nothing else."
        );
        prompt
    }

    /// Parse a reply that should hold a single bare identifier.
    ///
    /// Surrounding whitespace, quotes, backticks and a trailing period are
    /// tolerated. Anything else fails with `ClassificationFailure`.
    pub fn parse_reply(reply: &str) -> Result<Category, TaskError> {
        let id = reply
            .trim()
            .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
            .trim_end_matches('.')
            .trim();

        if id.is_empty() {
            return Err(TaskError::ClassificationFailure("empty reply".to_string()));
        }
        id.parse()
    }
}

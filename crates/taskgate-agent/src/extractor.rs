//! Parameter extraction.

use std::fmt::Write;
use std::sync::Arc;

use tracing::debug;

use taskgate_core::{Category, ParameterRecord, TaskError, TaskParams, TaskRequest};
use taskgate_llm::TextGenerator;

use crate::failure::TaskFailure;

/// Asks the model for a parameter record and checks it against the
/// category's schema.
///
/// Paths in the result are untouched strings. They are only ever resolved by
/// the executor, through the sandbox.
#[derive(Clone)]
pub struct ParameterExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl ParameterExtractor {
    /// Create an extractor using `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Extract typed parameters for a request already classified as `category`.
    pub async fn extract(
        &self,
        request: &TaskRequest,
        category: Category,
    ) -> Result<TaskParams, TaskFailure> {
        let prompt = Self::prompt(request.description(), category);

        let reply = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|err| TaskFailure::collaborator(TaskError::ExtractionFailure, err))?;

        debug!(reply = %reply, category = %category, "Extractor reply");
        Self::parse_reply(category, &reply).map_err(TaskFailure::from)
    }

    /// Category-aware prompt describing the expected JSON object.
    pub fn prompt(description: &str, category: Category) -> String {
        let mut prompt = format!(
            "Extract the parameters for this task.\n\n\
             Category: {} ({})\n\
             Task: {description}\n\n\
             Reply with a single JSON object and nothing else. Use exactly these fields:\n\
             - \"input_file\": {}\n\
             - \"output_file\": output file path as written in the task, or null\n",
            category.id(),
            category.description(),
            input_hint(category),
        );

        let keys = TaskParams::schema_keys(category);
        if keys.is_empty() && !has_typed_schema(category) {
            prompt.push_str("- \"parameters\": an object with any other task-specific parameters\n");
        } else if keys.is_empty() {
            prompt.push_str("- \"parameters\": {}\n");
        } else {
            prompt.push_str("- \"parameters\": an object that may contain only these keys, omitted when the task does not mention them:\n");
            for key in keys {
                let _ = writeln!(prompt, "  - \"{key}\": {}", parameter_hint(key));
            }
        }
        prompt
    }

    /// Parse a reply into typed parameters.
    ///
    /// A Markdown code fence around the object is tolerated. Anything that is
    /// not a parameter record, or that does not fit the category's schema,
    /// fails with `ExtractionFailure`.
    pub fn parse_reply(category: Category, reply: &str) -> Result<TaskParams, TaskError> {
        let body = strip_code_fence(reply);
        let record: ParameterRecord = serde_json::from_str(body).map_err(|e| {
            TaskError::ExtractionFailure(format!(
                "reply is not a valid parameter record ({})",
                describe_json_error(&e)
            ))
        })?;
        TaskParams::from_record(category, record)
    }
}

/// Short reason that never echoes the reply itself.
fn describe_json_error(err: &serde_json::Error) -> &'static str {
    use serde_json::error::Category as JsonCategory;

    match err.classify() {
        JsonCategory::Io => "unreadable",
        JsonCategory::Syntax => "not JSON",
        JsonCategory::Data => "unexpected fields or types",
        JsonCategory::Eof => "truncated JSON",
    }
}

fn has_typed_schema(category: Category) -> bool {
    matches!(
        category,
        Category::A3
            | Category::A4
            | Category::A5
            | Category::A6
            | Category::A7
            | Category::A10
            | Category::B3
            | Category::B5
            | Category::B6
            | Category::B9
            | Category::B10
    )
}

fn input_hint(category: Category) -> &'static str {
    match category {
        Category::A5 | Category::A6 => "input directory path as written in the task, or null",
        Category::A10 | Category::B5 => {
            "SQLite database file path as written in the task, or null"
        }
        Category::B3 | Category::B6 => "null (the URL goes in \"parameters\")",
        _ => "input file path as written in the task, or null",
    }
}

fn parameter_hint(key: &str) -> &'static str {
    match key {
        "weekday" => "day of the week to count, e.g. \"Wednesday\"",
        "sort_keys" => "list of field names to sort by, most significant first",
        "count" => "number of most recent files to use",
        "ticket_type" => "ticket type to total, e.g. \"Gold\"",
        "query" => "the SQL query to run",
        "column" => "name of the CSV column to filter on",
        "value" => "value the column must equal",
        "url" => "http or https URL to fetch",
        "method" => "HTTP method; only \"GET\" is supported",
        "headers" => "object of request header names to string values",
        "selectors" => "list of CSS selectors whose element text to collect",
        _ => "task-specific value",
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

//! Render Markdown to HTML.

use std::sync::Arc;

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use serde_json::json;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

/// Renders CommonMark (plus tables, strikethrough and task lists) to HTML.
pub struct MarkdownToHtmlExecutor {
    storage: Arc<Storage>,
}

impl MarkdownToHtmlExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::MarkdownToHtml { input, output } = params else {
            return Err(mismatched(Category::B9, params));
        };

        let markdown = self.storage.read(input).await?;
        let rendered = render(&markdown);

        self.storage.write(output, &rendered).await?;
        Ok(Payload::from_iter([("bytes".to_string(), json!(rendered.len()))]))
    }
}

#[async_trait]
impl TaskExecutor for MarkdownToHtmlExecutor {
    fn category(&self) -> Category {
        Category::B9
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn render(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

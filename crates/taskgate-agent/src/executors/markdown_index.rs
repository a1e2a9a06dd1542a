//! Index Markdown files by their first top-level heading.

use std::sync::Arc;

use async_trait::async_trait;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde_json::{json, Map, Value};
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

/// Maps each `*.md` file below a directory (relative path) to the text of
/// its first level-one heading. Files without one are left out.
pub struct MarkdownIndexExecutor {
    storage: Arc<Storage>,
}

impl MarkdownIndexExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::MarkdownIndex { input_dir, output } = params else {
            return Err(mismatched(Category::A6, params));
        };

        let entries = self.storage.list_dir(input_dir, true).await?;
        let mut index = Map::new();
        let mut scanned = 0;
        for entry in entries
            .iter()
            .filter(|e| !e.is_dir && e.relative.ends_with(".md"))
        {
            scanned += 1;
            let content = self.storage.read(&entry.path).await?;
            if let Some(title) = first_h1(&content) {
                index.insert(entry.relative.clone(), Value::String(title));
            }
        }
        debug!(scanned, indexed = index.len(), "Built markdown index");

        let indexed = index.len();
        self.storage.write_json(output, &index).await?;
        Ok(Payload::from_iter([
            ("scanned".to_string(), json!(scanned)),
            ("indexed".to_string(), json!(indexed)),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for MarkdownIndexExecutor {
    fn category(&self) -> Category {
        Category::A6
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn first_h1(markdown: &str) -> Option<String> {
    let mut in_heading = false;
    let mut title = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::Text(text) | Event::Code(text) if in_heading => title.push_str(&text),
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_heading => {
                return Some(title.trim().to_string())
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    #[test]
    fn test_first_h1() {
        assert_eq!(first_h1("# Hello `world`\n\n# Second"), Some("Hello world".to_string()));
        assert_eq!(first_h1("intro\n\n## Sub\n\n# Main"), Some("Main".to_string()));
        assert_eq!(first_h1("```\n# not a heading\n```\n"), None);
        assert_eq!(first_h1("no headings"), None);
    }

    #[tokio::test]
    async fn test_indexes_recursively() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("guide")).unwrap();
        std::fs::write(docs.join("README.md"), "# Project\ntext").unwrap();
        std::fs::write(docs.join("guide/install.md"), "Intro\n\n# Installing\n").unwrap();
        std::fs::write(docs.join("guide/empty.md"), "nothing here").unwrap();
        std::fs::write(docs.join("notes.txt"), "# Not markdown").unwrap();

        let storage = Arc::new(Storage::new(&SandboxConfig::new(dir.path())).unwrap());
        let executor = MarkdownIndexExecutor::new(storage);
        let result = executor
            .execute(&TaskParams::MarkdownIndex {
                input_dir: "docs".to_string(),
                output: "docs/index.json".to_string(),
            })
            .await;
        assert!(result.is_success());

        let index: Value =
            serde_json::from_str(&std::fs::read_to_string(docs.join("index.json")).unwrap()).unwrap();
        assert_eq!(
            index,
            json!({"README.md": "Project", "guide/install.md": "Installing"})
        );
    }
}

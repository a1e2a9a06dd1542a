//! Collect element text from a web page.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::{fetch, mismatched};
use crate::registry::TaskExecutor;

/// Fetches a page and writes `{selector: [text, ...]}` as JSON.
///
/// Text is the concatenated text of each matching element, trimmed.
pub struct WebScrapingExecutor {
    storage: Arc<Storage>,
    client: Client,
}

impl WebScrapingExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            client: Client::new(),
        }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::WebScraping { url, selectors, output } = params else {
            return Err(mismatched(Category::B6, params));
        };

        // Bad selectors fail before any request is made.
        let compiled = compile(selectors)?;

        let page = fetch::get(
            &self.client,
            url,
            &Default::default(),
            self.storage.max_file_size(),
        )
        .await?;

        let results = scrape(&page.body, &compiled);
        let matches: usize = results
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum();
        debug!(selectors = compiled.len(), matches, "Scraped page");

        self.storage.write_json(output, &results).await?;
        Ok(Payload::from_iter([
            ("selectors".to_string(), json!(results.len())),
            ("matches".to_string(), json!(matches)),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for WebScrapingExecutor {
    fn category(&self) -> Category {
        Category::B6
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn compile(selectors: &[String]) -> Result<Vec<(&str, Selector)>, TaskError> {
    selectors
        .iter()
        .map(|raw| {
            Selector::parse(raw)
                .map(|selector| (raw.as_str(), selector))
                .map_err(|_| TaskError::MalformedData(format!("invalid CSS selector '{raw}'")))
        })
        .collect()
}

fn scrape(document: &str, selectors: &[(&str, Selector)]) -> Map<String, Value> {
    let html = Html::parse_document(document);
    selectors
        .iter()
        .map(|(raw, selector)| {
            let texts = html
                .select(selector)
                .map(|element| Value::String(element.text().collect::<String>().trim().to_string()))
                .collect();
            (raw.to_string(), Value::Array(texts))
        })
        .collect()
}

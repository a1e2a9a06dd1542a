//! Fetch an HTTP resource and save it.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::{fetch, mismatched};
use crate::registry::TaskExecutor;

/// GETs a URL and writes the body to a sandboxed file.
///
/// A JSON response is written pretty-printed; anything else is written as
/// received.
pub struct ApiFetchExecutor {
    storage: Arc<Storage>,
    client: Client,
}

impl ApiFetchExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            client: Client::new(),
        }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::ApiFetch { url, headers, output } = params else {
            return Err(mismatched(Category::B3, params));
        };

        let fetched = fetch::get(&self.client, url, headers, self.storage.max_file_size()).await?;

        let format = if fetched.is_json() {
            let value: Value = serde_json::from_str(&fetched.body).map_err(|e| {
                TaskError::MalformedData(format!(
                    "response is declared as JSON but does not parse (line {}, column {})",
                    e.line(),
                    e.column()
                ))
            })?;
            self.storage.write_json(output, &value).await?;
            "json"
        } else {
            self.storage.write(output, &fetched.body).await?;
            "text"
        };

        Ok(Payload::from_iter([
            ("status".to_string(), json!(fetched.status)),
            ("format".to_string(), json!(format)),
            ("bytes".to_string(), json!(fetched.body.len())),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for ApiFetchExecutor {
    fn category(&self) -> Category {
        Category::B3
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use taskgate_core::ErrorKind;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    use crate::executors::fetch::testing::serve_once;

    fn setup(config: impl FnOnce(SandboxConfig) -> SandboxConfig) -> (TempDir, ApiFetchExecutor) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(&config(SandboxConfig::new(dir.path()))).unwrap());
        (dir, ApiFetchExecutor::new(storage))
    }

    fn params(url: String, output: &str) -> TaskParams {
        TaskParams::ApiFetch {
            url,
            headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
            output: output.to_string(),
        }
    }

    fn failure_kind(result: ExecutorResult) -> ErrorKind {
        match result {
            ExecutorResult::Failure(failure) => failure.kind,
            other => panic!("Expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_response_is_pretty_printed() {
        let (dir, executor) = setup(|c| c);
        let (base, server) =
            serve_once("200 OK", "application/json", r#"{"items":[1,2]}"#.to_string()).await;

        let result = executor
            .execute(&params(format!("{base}/items"), "api/items.json"))
            .await;

        match result {
            ExecutorResult::Success(payload) => {
                assert_eq!(payload["status"], json!(200));
                assert_eq!(payload["format"], json!("json"));
            }
            other => panic!("Expected Success, got {other:?}"),
        }
        assert_eq!(
            std::fs::read_to_string(dir.path().join("api/items.json")).unwrap(),
            "{\n  \"items\": [\n    1,\n    2\n  ]\n}"
        );
        assert!(server
            .await
            .unwrap()
            .to_ascii_lowercase()
            .contains("accept: application/json"));
    }

    #[tokio::test]
    async fn test_text_response_is_written_as_is() {
        let (dir, executor) = setup(|c| c);
        let (base, _server) = serve_once("200 OK", "text/csv", "a,b\n1,2\n".to_string()).await;

        let result = executor.execute(&params(base, "export.csv")).await;

        assert!(result.is_success(), "{result:?}");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("export.csv")).unwrap(),
            "a,b\n1,2\n"
        );
    }

    #[tokio::test]
    async fn test_oversized_body_writes_nothing() {
        let (dir, executor) = setup(|c| c.with_max_file_size(32));
        let (base, _server) = serve_once("200 OK", "text/plain", "z".repeat(100)).await;

        let kind = failure_kind(executor.execute(&params(base, "big.txt")).await);

        assert_eq!(kind, ErrorKind::SizeLimitExceeded);
        assert!(!dir.path().join("big.txt").exists());
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let (dir, executor) = setup(|c| c);
        let (base, _server) = serve_once("200 OK", "application/json", "{oops".to_string()).await;

        let kind = failure_kind(executor.execute(&params(base, "api.json")).await);

        assert_eq!(kind, ErrorKind::MalformedData);
        assert!(!dir.path().join("api.json").exists());
    }

    #[tokio::test]
    async fn test_output_outside_sandbox() {
        let (_dir, executor) = setup(|c| c);
        let (base, _server) = serve_once("200 OK", "text/plain", "hi".to_string()).await;

        let kind = failure_kind(executor.execute(&params(base, "../escape.txt")).await);
        assert_eq!(kind, ErrorKind::PathViolation);
    }

    #[tokio::test]
    async fn test_wrong_params() {
        let (_dir, executor) = setup(|c| c);
        let kind = failure_kind(
            executor
                .execute(&TaskParams::ExtractEmail {
                    input: "email.txt".to_string(),
                    output: "sender.txt".to_string(),
                })
                .await,
        );
        assert_eq!(kind, ErrorKind::ExecutionFailure);
    }
}

//! Sender address of an email message.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

const ADDRESS: &str = r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}";

/// Writes the address from the `From:` header, or the first address in the
/// message when there is no usable header.
pub struct ExtractEmailExecutor {
    storage: Arc<Storage>,
}

impl ExtractEmailExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::ExtractEmail { input, output } = params else {
            return Err(mismatched(Category::A7, params));
        };

        let message = self.storage.read(input).await?;
        let sender = sender_address(&message)?
            .ok_or_else(|| TaskError::MalformedData("no email address found".to_string()))?;

        self.storage.write(output, &sender).await?;
        Ok(Payload::from_iter([("email".to_string(), json!(sender))]))
    }
}

#[async_trait]
impl TaskExecutor for ExtractEmailExecutor {
    fn category(&self) -> Category {
        Category::A7
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn sender_address(message: &str) -> Result<Option<String>, TaskError> {
    let compile = |pattern: &str| {
        Regex::new(pattern).map_err(|e| TaskError::ExecutionFailure(format!("bad pattern: {e}")))
    };
    let header = compile(&format!(r"(?mi)^from:[^\n]*?({ADDRESS})"))?;
    let any = compile(ADDRESS)?;

    let found = header
        .captures(message)
        .and_then(|c| c.get(1))
        .or_else(|| any.find(message))
        .map(|m| m.as_str().to_string());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_core::ErrorKind;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_from_header() {
        let message = "To: team@example.org\nFrom: \"Jane Doe\" <jane.doe+work@mail.example.com>\nSubject: hi\n\nping ops@example.net";
        assert_eq!(
            sender_address(message).unwrap().as_deref(),
            Some("jane.doe+work@mail.example.com")
        );
    }

    #[test]
    fn test_falls_back_to_first_address() {
        let message = "Subject: hi\n\nwrite to help@example.io or sales@example.io";
        assert_eq!(sender_address(message).unwrap().as_deref(), Some("help@example.io"));
    }

    #[test]
    fn test_no_address() {
        assert_eq!(sender_address("From: nobody\n\nhello").unwrap(), None);
    }

    #[tokio::test]
    async fn test_writes_sender() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("email.txt"), "From: a@b.co\n\nbody").unwrap();
        std::fs::write(dir.path().join("blank.txt"), "no addresses").unwrap();
        let storage = Arc::new(Storage::new(&SandboxConfig::new(dir.path())).unwrap());
        let executor = ExtractEmailExecutor::new(storage);

        let result = executor
            .execute(&TaskParams::ExtractEmail {
                input: "email.txt".to_string(),
                output: "email-sender.txt".to_string(),
            })
            .await;
        assert!(result.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("email-sender.txt")).unwrap(),
            "a@b.co"
        );

        let result = executor
            .execute(&TaskParams::ExtractEmail {
                input: "blank.txt".to_string(),
                output: "email-sender.txt".to_string(),
            })
            .await;
        match result {
            ExecutorResult::Failure(failure) => assert_eq!(failure.kind, ErrorKind::MalformedData),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }
}

//! First lines of the most recent log files.

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

/// Writes the first line of each of the `count` newest `*.log` files in a
/// directory, newest first.
pub struct RecentLogsExecutor {
    storage: Arc<Storage>,
}

impl RecentLogsExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::RecentLogs {
            input_dir,
            output,
            count,
        } = params
        else {
            return Err(mismatched(Category::A5, params));
        };

        let mut logs: Vec<_> = self
            .storage
            .list_dir(input_dir, false)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_dir && entry.relative.ends_with(".log"))
            .collect();
        // Newest first; ties broken by name so reruns are identical.
        logs.sort_by(|a, b| {
            Reverse(a.modified)
                .cmp(&Reverse(b.modified))
                .then_with(|| a.relative.cmp(&b.relative))
        });
        logs.truncate(*count);

        let mut lines = Vec::with_capacity(logs.len());
        for log in &logs {
            let content = self.storage.read(&log.path).await?;
            lines.push(content.lines().next().unwrap_or("").trim().to_string());
        }
        debug!(files = logs.len(), "Collected recent log lines");

        self.storage.write(output, &lines.join("\n")).await?;
        Ok(Payload::from_iter([
            ("files".to_string(), json!(logs.iter().map(|l| &l.relative).collect::<Vec<_>>())),
            ("lines".to_string(), json!(lines.len())),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for RecentLogsExecutor {
    fn category(&self) -> Category {
        Category::A5
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use taskgate_core::ErrorKind;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    fn write_log(dir: &TempDir, name: &str, content: &str, age_secs: u64) {
        let path = dir.path().join("logs").join(name);
        std::fs::write(&path, content).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    fn setup() -> (TempDir, RecentLogsExecutor) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        write_log(&dir, "old.log", "old first\nold second\n", 300);
        write_log(&dir, "newest.log", "newest first\n", 10);
        write_log(&dir, "middle.log", "  middle first  \nmore\n", 100);
        write_log(&dir, "notes.txt", "not a log\n", 1);
        let storage = Arc::new(Storage::new(&SandboxConfig::new(dir.path())).unwrap());
        (dir, RecentLogsExecutor::new(storage))
    }

    fn params(count: usize) -> TaskParams {
        TaskParams::RecentLogs {
            input_dir: "logs".to_string(),
            output: "logs-recent.txt".to_string(),
            count,
        }
    }

    #[tokio::test]
    async fn test_newest_first_limited_to_count() {
        let (dir, executor) = setup();
        assert!(executor.execute(&params(2)).await.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs-recent.txt")).unwrap(),
            "newest first\nmiddle first"
        );
    }

    #[tokio::test]
    async fn test_count_larger_than_available() {
        let (dir, executor) = setup();
        assert!(executor.execute(&params(10)).await.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs-recent.txt")).unwrap(),
            "newest first\nmiddle first\nold first"
        );
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let (_dir, executor) = setup();
        let result = executor
            .execute(&TaskParams::RecentLogs {
                input_dir: "nowhere".to_string(),
                output: "out.txt".to_string(),
                count: 3,
            })
            .await;
        match result {
            ExecutorResult::Failure(failure) => assert_eq!(failure.kind, ErrorKind::NotFound),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }
}

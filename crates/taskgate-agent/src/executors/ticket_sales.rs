//! Total ticket sales for one ticket type.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use serde_json::{json, Value};
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::{mismatched, sqlite};
use crate::registry::TaskExecutor;

const TOTAL_SALES: &str = "SELECT COALESCE(SUM(units * price), 0) FROM tickets \
                           WHERE LOWER(TRIM(type)) = LOWER(TRIM(?1))";

/// Sums `units * price` over the `tickets` table for one ticket type.
pub struct TicketSalesExecutor {
    storage: Arc<Storage>,
}

impl TicketSalesExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::TicketSales {
            database,
            output,
            ticket_type,
        } = params
        else {
            return Err(mismatched(Category::A10, params));
        };

        let (path, name) = sqlite::resolve(&self.storage, database).await?;
        let ticket_type = ticket_type.clone();
        let total = tokio::task::spawn_blocking(move || -> Result<Value, TaskError> {
            let conn = sqlite::open_read_only(&path, &name)?;
            conn.query_row(TOTAL_SALES, params![ticket_type], |row| {
                Ok(sqlite::to_json(row.get_ref(0)?))
            })
            .map_err(sqlite::query_error)
        })
        .await
        .map_err(|e| TaskError::ExecutionFailure(format!("query task failed: {e}")))??;

        let text = match &total {
            Value::Number(n) => n.to_string(),
            _ => "0".to_string(),
        };
        debug!(total = %text, "Computed ticket sales");

        self.storage.write(output, &text).await?;
        Ok(Payload::from_iter([("total_sales".to_string(), total)]))
    }
}

#[async_trait]
impl TaskExecutor for TicketSalesExecutor {
    fn category(&self) -> Category {
        Category::A10
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use taskgate_core::ErrorKind;
    use taskgate_sandbox::SandboxConfig;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TicketSalesExecutor) {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open(dir.path().join("ticket-sales.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE tickets (type TEXT, units INTEGER, price REAL);
             INSERT INTO tickets VALUES ('Gold', 2, 10.5);
             INSERT INTO tickets VALUES (' gold ', 1, 4.0);
             INSERT INTO tickets VALUES ('GOLD', 3, 2.0);
             INSERT INTO tickets VALUES ('Silver', 100, 1.0);",
        )
        .unwrap();
        drop(conn);

        let storage = Arc::new(Storage::new(&SandboxConfig::new(dir.path())).unwrap());
        (dir, TicketSalesExecutor::new(storage))
    }

    fn params(ticket_type: &str) -> TaskParams {
        TaskParams::TicketSales {
            database: "ticket-sales.db".to_string(),
            output: "ticket-sales-gold.txt".to_string(),
            ticket_type: ticket_type.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sums_matching_type() {
        let (dir, executor) = setup();
        let result = executor.execute(&params("Gold")).await;

        match result {
            ExecutorResult::Success(payload) => assert_eq!(payload["total_sales"], json!(31.0)),
            other => panic!("Expected Success, got {other:?}"),
        }
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ticket-sales-gold.txt")).unwrap(),
            "31.0"
        );
    }

    #[tokio::test]
    async fn test_unknown_type_totals_zero() {
        let (dir, executor) = setup();
        assert!(executor.execute(&params("Bronze")).await.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ticket-sales-gold.txt")).unwrap(),
            "0"
        );
    }

    #[tokio::test]
    async fn test_missing_database() {
        let (_dir, executor) = setup();
        let result = executor
            .execute(&TaskParams::TicketSales {
                database: "missing.db".to_string(),
                output: "out.txt".to_string(),
                ticket_type: "Gold".to_string(),
            })
            .await;
        match result {
            ExecutorResult::Failure(failure) => assert_eq!(failure.kind, ErrorKind::NotFound),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_database_outside_sandbox() {
        let (_dir, executor) = setup();
        let result = executor
            .execute(&TaskParams::TicketSales {
                database: "/etc/passwd".to_string(),
                output: "out.txt".to_string(),
                ticket_type: "Gold".to_string(),
            })
            .await;
        match result {
            ExecutorResult::Failure(failure) => assert_eq!(failure.kind, ErrorKind::PathViolation),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }
}

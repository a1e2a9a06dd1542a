//! Run one read-only SQL statement.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Batch;
use serde_json::{json, Map, Value};
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::{mismatched, sqlite};
use crate::registry::TaskExecutor;

/// Runs a single query on a read-only connection.
///
/// Rows are written as a JSON array of objects when the output ends in
/// `.json`, otherwise as CSV with a header row. Statements that would modify
/// the database are refused before they run.
pub struct SqlQueryExecutor {
    storage: Arc<Storage>,
}

impl SqlQueryExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::SqlQuery {
            database,
            query,
            output,
        } = params
        else {
            return Err(mismatched(Category::B5, params));
        };

        let (path, name) = sqlite::resolve(&self.storage, database).await?;
        let query = query.clone();
        let (columns, rows) = tokio::task::spawn_blocking(move || {
            let conn = sqlite::open_read_only(&path, &name)?;
            run_query(&conn, &query)
        })
        .await
        .map_err(|e| TaskError::ExecutionFailure(format!("query task failed: {e}")))??;

        debug!(rows = rows.len(), columns = columns.len(), "Query returned");

        let row_count = rows.len();
        if is_json_output(output) {
            let records: Vec<Value> = rows
                .into_iter()
                .map(|row| Value::Object(columns.iter().cloned().zip(row).collect::<Map<_, _>>()))
                .collect();
            self.storage.write_json(output, &records).await?;
        } else {
            self.storage.write(output, &to_csv(&columns, &rows)?).await?;
        }

        Ok(Payload::from_iter([
            ("rows".to_string(), json!(row_count)),
            ("columns".to_string(), json!(columns)),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for SqlQueryExecutor {
    fn category(&self) -> Category {
        Category::B5
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

type Rows = Vec<Vec<Value>>;

fn run_query(conn: &rusqlite::Connection, query: &str) -> Result<(Vec<String>, Rows), TaskError> {
    // prepare() compiles only the first statement and ignores the rest.
    let mut batch = Batch::new(conn, query);
    let mut statements = 0;
    while batch.next().map_err(sqlite::query_error)?.is_some() {
        statements += 1;
        if statements > 1 {
            return Err(TaskError::ExecutionFailure(
                "only a single statement is allowed".to_string(),
            ));
        }
    }
    if statements == 0 {
        return Err(TaskError::ExecutionFailure("query is empty".to_string()));
    }

    let mut stmt = conn.prepare(query).map_err(sqlite::query_error)?;
    if !stmt.readonly() {
        return Err(TaskError::ExecutionFailure(
            "only read-only statements are allowed".to_string(),
        ));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(sqlite::query_error)?;
    while let Some(row) = cursor.next().map_err(sqlite::query_error)? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(sqlite::to_json(row.get_ref(i).map_err(sqlite::query_error)?));
        }
        rows.push(values);
    }
    Ok((columns, rows))
}

fn is_json_output(output: &str) -> bool {
    Path::new(output)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn to_csv(columns: &[String], rows: &Rows) -> Result<String, TaskError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_error = |e: csv::Error| TaskError::ExecutionFailure(format!("cannot write CSV: {e}"));

    writer.write_record(columns).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(row.iter().map(|v| match v {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TaskError::ExecutionFailure(format!("cannot write CSV: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| TaskError::ExecutionFailure("CSV output is not UTF-8".to_string()))
}

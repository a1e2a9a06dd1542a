//! Filter CSV rows by one column value.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

/// Keeps the rows whose `column` equals `value` (both trimmed) and turns
/// them into JSON records keyed by header.
///
/// With an output path the records are written there; without one they are
/// returned in the payload.
pub struct CsvFilterExecutor {
    storage: Arc<Storage>,
}

impl CsvFilterExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::CsvFilter {
            input,
            output,
            column,
            value,
        } = params
        else {
            return Err(mismatched(Category::B10, params));
        };

        let content = self.storage.read(input).await?;
        let records = filter_rows(&content, column, value)?;
        debug!(matched = records.len(), column = %column, "Filtered CSV");

        let matched = records.len();
        match output {
            Some(output) => {
                self.storage.write_json(output, &records).await?;
                Ok(Payload::from_iter([("rows".to_string(), json!(matched))]))
            }
            None => Ok(Payload::from_iter([
                ("rows".to_string(), json!(matched)),
                ("records".to_string(), Value::Array(records)),
            ])),
        }
    }
}

#[async_trait]
impl TaskExecutor for CsvFilterExecutor {
    fn category(&self) -> Category {
        Category::B10
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn filter_rows(content: &str, column: &str, value: &str) -> Result<Vec<Value>, TaskError> {
    let malformed = |e: csv::Error| TaskError::MalformedData(format!("invalid CSV: {e}"));

    let mut reader = csv::ReaderBuilder::new().from_reader(content.as_bytes());
    let headers = reader.headers().map_err(malformed)?.clone();
    let index = headers
        .iter()
        .position(|h| h.trim() == column.trim())
        .ok_or_else(|| TaskError::MalformedData(format!("column '{column}' not found")))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(malformed)?;
        if row.get(index).map(str::trim) != Some(value.trim()) {
            continue;
        }
        let record: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.trim().to_string(), Value::String(v.to_string())))
            .collect();
        records.push(Value::Object(record));
    }
    Ok(records)
}

//! Count dates falling on a weekday.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde_json::json;
use tracing::debug;

use taskgate_core::{Category, ExecutorResult, Payload, TaskError, TaskParams};
use taskgate_sandbox::Storage;

use super::mismatched;
use crate::registry::TaskExecutor;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%b %d, %Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S"];

/// Reads one date per line and writes how many fall on the requested weekday.
pub struct CountWeekdaysExecutor {
    storage: Arc<Storage>,
}

impl CountWeekdaysExecutor {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    async fn run(&self, params: &TaskParams) -> Result<Payload, TaskError> {
        let TaskParams::CountWeekdays {
            input,
            output,
            weekday,
        } = params
        else {
            return Err(mismatched(Category::A3, params));
        };

        let content = self.storage.read(input).await?;
        let count = count_weekday(&content, *weekday)?;
        debug!(count, weekday = %weekday, "Counted weekdays");

        self.storage.write(output, &count.to_string()).await?;
        Ok(Payload::from_iter([
            ("count".to_string(), json!(count)),
            ("weekday".to_string(), json!(weekday.to_string())),
        ]))
    }
}

#[async_trait]
impl TaskExecutor for CountWeekdaysExecutor {
    fn category(&self) -> Category {
        Category::A3
    }

    async fn execute(&self, params: &TaskParams) -> ExecutorResult {
        self.run(params).await.into()
    }
}

fn count_weekday(content: &str, weekday: Weekday) -> Result<usize, TaskError> {
    let mut count = 0;
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let date = parse_date(line).ok_or_else(|| {
            TaskError::MalformedData(format!("line {} is not a recognized date", index + 1))
        })?;
        if date.weekday() == weekday {
            count += 1;
        }
    }
    Ok(count)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|dt| dt.date())
        })
}

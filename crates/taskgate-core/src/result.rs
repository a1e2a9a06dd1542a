//! Executor outcomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ErrorKind, TaskError};

/// Success payload: result field name to value.
pub type Payload = Map<String, Value>;

/// Failure descriptor reported by an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorFailure {
    /// Taxonomy kind of the underlying failure.
    pub kind: ErrorKind,
    /// Human-readable message, free of filesystem layout outside the sandbox.
    pub message: String,
}

impl ExecutorFailure {
    /// Create a new failure descriptor.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<TaskError> for ExecutorFailure {
    fn from(err: TaskError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Tagged outcome of one executor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum ExecutorResult {
    Success(Payload),
    Failure(ExecutorFailure),
}

impl ExecutorResult {
    /// Build a success result from `(field, value)` pairs.
    pub fn success<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Success(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a failure result.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(ExecutorFailure::new(kind, message))
    }

    /// Returns true on success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<Payload, TaskError>> for ExecutorResult {
    fn from(result: Result<Payload, TaskError>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(err) => Self::Failure(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_builder() {
        let result = ExecutorResult::success([("count", json!(2))]);
        match result {
            ExecutorResult::Success(payload) => assert_eq!(payload["count"], json!(2)),
            _ => panic!("Expected Success"),
        }
    }

    #[test]
    fn test_error_keeps_kind() {
        let result: ExecutorResult =
            Err::<Payload, _>(TaskError::NotFound("dates.txt".into())).into();
        match result {
            ExecutorResult::Failure(failure) => {
                assert_eq!(failure.kind, ErrorKind::NotFound);
                assert_eq!(failure.message, "Not found: dates.txt");
            }
            _ => panic!("Expected Failure"),
        }
    }
}

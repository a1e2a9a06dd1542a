//! Failure descriptor carried by a failed dispatch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taskgate_core::{ErrorKind, ExecutorFailure, TaskError};
use taskgate_llm::LlmError;

/// Why a request ended in `Failed(kind)`.
///
/// `cause` holds the underlying descriptor when there is one: the executor's
/// own failure for `ExecutionFailure`, or the collaborator error behind a
/// classification or extraction failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<ExecutorFailure>,
}

impl TaskFailure {
    /// Create a failure without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Builder method to attach the underlying descriptor.
    pub fn with_cause(mut self, cause: ExecutorFailure) -> Self {
        self.cause = Some(cause);
        self
    }

    /// A failed executor run. The executor's descriptor is kept as the cause.
    pub fn execution(cause: ExecutorFailure) -> Self {
        Self {
            kind: ErrorKind::ExecutionFailure,
            message: cause.message.clone(),
            cause: Some(cause),
        }
    }

    /// A failed collaborator call during `stage`.
    pub(crate) fn collaborator(stage: fn(String) -> TaskError, err: LlmError) -> Self {
        let cause = ExecutorFailure::new(err.kind(), err.to_string());
        Self::from(stage(err.to_string())).with_cause(cause)
    }
}

impl From<TaskError> for TaskFailure {
    fn from(err: TaskError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_failure_keeps_transport_cause() {
        let failure = TaskFailure::collaborator(TaskError::ClassificationFailure, LlmError::Timeout);
        assert_eq!(failure.kind, ErrorKind::ClassificationFailure);
        assert_eq!(failure.message, "Classification failed: Request timed out");

        let cause = failure.cause.unwrap();
        assert_eq!(cause.kind, ErrorKind::TransientTransportError);
    }

    #[test]
    fn test_execution_failure_preserves_descriptor() {
        let descriptor = ExecutorFailure::new(ErrorKind::NotFound, "Not found: dates.txt does not exist");
        let failure = TaskFailure::execution(descriptor.clone());
        assert_eq!(failure.kind, ErrorKind::ExecutionFailure);
        assert_eq!(failure.message, descriptor.message);
        assert_eq!(failure.cause, Some(descriptor));
    }
}

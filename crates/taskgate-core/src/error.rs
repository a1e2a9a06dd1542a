//! Error taxonomy shared by every pipeline stage.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of failure, as reported to callers.
///
/// Every non-success outcome of the pipeline carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Task description empty or not text.
    InvalidInput,
    /// Path escapes the sandbox.
    PathViolation,
    /// Model reply was not a known category, or the call failed.
    ClassificationFailure,
    /// Model reply did not match the parameter schema, or the call failed.
    ExtractionFailure,
    /// Category has no registered executor.
    UnsupportedCategory,
    /// Executor reported a failure.
    ExecutionFailure,
    /// Path resolved but nothing exists there.
    NotFound,
    /// Content did not parse as the expected structure.
    MalformedData,
    /// Content larger than the configured ceiling.
    SizeLimitExceeded,
    /// Connection reset, timeout or 5xx from the collaborator.
    TransientTransportError,
}

impl ErrorKind {
    /// All kinds, in taxonomy order.
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::InvalidInput,
        ErrorKind::PathViolation,
        ErrorKind::ClassificationFailure,
        ErrorKind::ExtractionFailure,
        ErrorKind::UnsupportedCategory,
        ErrorKind::ExecutionFailure,
        ErrorKind::NotFound,
        ErrorKind::MalformedData,
        ErrorKind::SizeLimitExceeded,
        ErrorKind::TransientTransportError,
    ];

    /// Stable snake_case code used on the wire and in metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::PathViolation => "path_violation",
            Self::ClassificationFailure => "classification_failure",
            Self::ExtractionFailure => "extraction_failure",
            Self::UnsupportedCategory => "unsupported_category",
            Self::ExecutionFailure => "execution_failure",
            Self::NotFound => "not_found",
            Self::MalformedData => "malformed_data",
            Self::SizeLimitExceeded => "size_limit_exceeded",
            Self::TransientTransportError => "transient_transport_error",
        }
    }

    /// Returns true if an operation failing with this kind may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientTransportError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pipeline error: a taxonomy kind plus a message safe to show to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Access denied: {0}")]
    PathViolation(String),

    #[error("Classification failed: {0}")]
    ClassificationFailure(String),

    #[error("Parameter extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Unsupported category: {0}")]
    UnsupportedCategory(String),

    #[error("Execution failed: {0}")]
    ExecutionFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Size limit exceeded: {size} bytes > {limit} bytes")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("Transient transport error: {0}")]
    TransientTransportError(String),
}

impl TaskError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::PathViolation(_) => ErrorKind::PathViolation,
            Self::ClassificationFailure(_) => ErrorKind::ClassificationFailure,
            Self::ExtractionFailure(_) => ErrorKind::ExtractionFailure,
            Self::UnsupportedCategory(_) => ErrorKind::UnsupportedCategory,
            Self::ExecutionFailure(_) => ErrorKind::ExecutionFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MalformedData(_) => ErrorKind::MalformedData,
            Self::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Self::TransientTransportError(_) => ErrorKind::TransientTransportError,
        }
    }

    /// Returns true if the failed operation may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_unique() {
        let mut codes: Vec<_> = ErrorKind::ALL.iter().map(|k| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_kind_serializes_as_code() {
        let json = serde_json::to_string(&ErrorKind::PathViolation).unwrap();
        assert_eq!(json, "\"path_violation\"");
    }

    #[test]
    fn test_only_transport_errors_retry() {
        let retryable: Vec<_> = ErrorKind::ALL
            .iter()
            .filter(|k| k.is_retryable())
            .collect();
        assert_eq!(retryable, vec![&ErrorKind::TransientTransportError]);
        assert!(!TaskError::ClassificationFailure("bad".into()).is_retryable());
    }

    #[test]
    fn test_size_limit_message() {
        let err = TaskError::SizeLimitExceeded {
            size: 11,
            limit: 10,
        };
        assert_eq!(err.kind(), ErrorKind::SizeLimitExceeded);
        assert_eq!(err.to_string(), "Size limit exceeded: 11 bytes > 10 bytes");
    }
}

//! Error types for collaborator calls.

use thiserror::Error;

use taskgate_core::ErrorKind;

/// Errors that can occur while calling the text-generation service.
///
/// Messages never include the raw response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// The attempt did not finish within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection failed, was reset, or the body could not be read.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Service returned HTTP {0}")]
    Status(u16),

    /// The body was not a chat completion with message content.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The client is not usable as configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Returns true if another attempt may succeed.
    ///
    /// Only transport-level trouble qualifies; a reply that arrived but
    /// cannot be used is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Status(code) => *code >= 500 || *code == 429,
            Self::MalformedResponse(_) | Self::Config(_) => false,
        }
    }

    /// Taxonomy kind describing this failure on its own.
    pub fn kind(&self) -> ErrorKind {
        if self.is_transient() {
            return ErrorKind::TransientTransportError;
        }
        match self {
            Self::MalformedResponse(_) => ErrorKind::MalformedData,
            _ => ErrorKind::ExecutionFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::Transport("connection reset".into()).is_transient());
        assert!(LlmError::Status(503).is_transient());
        assert!(LlmError::Status(429).is_transient());

        assert!(!LlmError::Status(400).is_transient());
        assert!(!LlmError::Status(401).is_transient());
        assert!(!LlmError::MalformedResponse("no choices".into()).is_transient());
        assert!(!LlmError::Config("missing token".into()).is_transient());
    }

    #[test]
    fn test_kind() {
        assert_eq!(LlmError::Status(502).kind(), ErrorKind::TransientTransportError);
        assert_eq!(
            LlmError::MalformedResponse("x".into()).kind(),
            ErrorKind::MalformedData
        );
        assert_eq!(LlmError::Status(403).kind(), ErrorKind::ExecutionFailure);
    }
}

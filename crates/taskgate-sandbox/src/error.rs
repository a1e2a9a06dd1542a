//! Error types for sandboxed file access.

use thiserror::Error;

use taskgate_core::TaskError;

/// Errors that can occur while resolving or accessing sandboxed paths.
///
/// Messages only ever mention paths relative to a sandbox root.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Path is outside every allowed root, or tried to get there.
    #[error("path outside allowed directories ({0})")]
    PathViolation(String),

    /// Path resolved but nothing exists there.
    #[error("{0}")]
    NotFound(String),

    /// Content did not parse as the expected form.
    #[error("{0}")]
    MalformedData(String),

    /// Content larger than the configured ceiling.
    #[error("{size} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    /// A configured root is unusable.
    #[error("invalid sandbox root: {0}")]
    InvalidRoot(String),

    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(String),
}

impl SandboxError {
    pub(crate) fn io(err: std::io::Error) -> Self {
        // io::Error's Display carries the OS message only, never the path.
        Self::Io(err.to_string())
    }
}

impl From<SandboxError> for TaskError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::PathViolation(reason) => TaskError::PathViolation(reason),
            SandboxError::NotFound(what) => TaskError::NotFound(what),
            SandboxError::MalformedData(what) => TaskError::MalformedData(what),
            SandboxError::SizeLimitExceeded { size, limit } => {
                TaskError::SizeLimitExceeded { size, limit }
            }
            SandboxError::InvalidRoot(_) | SandboxError::Io(_) => {
                TaskError::ExecutionFailure(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_core::ErrorKind;

    #[test]
    fn test_maps_onto_taxonomy() {
        let cases = [
            (SandboxError::PathViolation("x".into()), ErrorKind::PathViolation),
            (SandboxError::NotFound("x".into()), ErrorKind::NotFound),
            (SandboxError::MalformedData("x".into()), ErrorKind::MalformedData),
            (
                SandboxError::SizeLimitExceeded { size: 2, limit: 1 },
                ErrorKind::SizeLimitExceeded,
            ),
            (SandboxError::Io("disk full".into()), ErrorKind::ExecutionFailure),
        ];
        for (err, kind) in cases {
            assert_eq!(TaskError::from(err).kind(), kind);
        }
    }
}

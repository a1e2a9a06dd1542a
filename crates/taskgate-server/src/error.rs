//! Startup errors.

use thiserror::Error;

use taskgate_llm::LlmError;
use taskgate_sandbox::SandboxError;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("sandbox: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("model client: {0}")]
    Llm(#[from] LlmError),
}

//! Text-generation collaborator for taskgate.
//!
//! The pipeline only ever needs one thing from a language model: send a
//! prompt, get text back. [`TextGenerator`] is that seam.
//!
//! - [`ChatClient`] talks to an OpenAI-compatible chat completions endpoint.
//! - [`Retrying`] wraps any generator with a per-attempt timeout and bounded
//!   retries of transient failures.
//! - [`ScriptedGenerator`] replays canned replies, useful for testing.
//!
//! # Example
//!
//! ```rust,no_run
//! use taskgate_llm::{ChatClient, LlmConfig, Retrying, TextGenerator};
//!
//! async fn ask() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LlmConfig::default().with_api_token("secret");
//!     let generator = Retrying::new(ChatClient::new(&config)?, config.retry_policy());
//!
//!     let reply = generator.generate("Reply with the single word: pong").await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod retry;
mod scripted;

pub use client::{ChatClient, TextGenerator};
pub use config::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::LlmError;
pub use retry::{RetryPolicy, Retrying};
pub use scripted::ScriptedGenerator;

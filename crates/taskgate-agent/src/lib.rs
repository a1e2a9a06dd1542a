//! The taskgate pipeline.
//!
//! A free-text task description goes through a fixed sequence of stages:
//!
//! 1. [`TaskClassifier`] asks the model for one category identifier.
//! 2. [`ParameterExtractor`] asks the model for a parameter record and checks
//!    it against the category's schema.
//! 3. [`ExecutorRegistry`] looks up the executor for the category.
//! 4. The executor runs against the sandbox.
//!
//! [`Dispatcher`] drives the stages and records every state it passes
//! through. It always produces exactly one terminal outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskgate_agent::{Dispatcher, ExecutorRegistry};
//! use taskgate_llm::{ChatClient, LlmConfig, Retrying};
//! use taskgate_sandbox::{SandboxConfig, Storage};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(Storage::new(&SandboxConfig::default())?);
//!     let config = LlmConfig::default().with_api_token("secret");
//!     let generator = Retrying::new(ChatClient::new(&config)?, config.retry_policy());
//!
//!     let dispatcher = Dispatcher::new(
//!         Arc::new(generator),
//!         Arc::new(ExecutorRegistry::standard(storage)),
//!     );
//!     let outcome = dispatcher
//!         .dispatch("How many Wednesdays are in /data/dates.txt? Write the count to /data/dates-wednesdays.txt")
//!         .await;
//!     println!("{}: {:?}", outcome.state(), outcome.result);
//!     Ok(())
//! }
//! ```

mod classifier;
mod dispatcher;
pub mod executors;
mod extractor;
mod failure;
mod registry;

pub use classifier::TaskClassifier;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use extractor::ParameterExtractor;
pub use failure::TaskFailure;
pub use registry::{ExecutorRegistry, TaskExecutor};

//! taskgate Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Filesystem
//! - Runtime specifics
//!
//! All types here describe a single task request as it moves through
//! classification, parameter extraction and execution.

pub mod category;
pub mod error;
pub mod ids;
pub mod params;
pub mod request;
pub mod result;
pub mod status;

// Re-export commonly used types
pub use category::Category;
pub use error::{ErrorKind, TaskError};
pub use ids::RequestId;
pub use params::{ParameterRecord, TaskParams};
pub use request::TaskRequest;
pub use result::{ExecutorFailure, ExecutorResult, Payload};
pub use status::DispatchState;

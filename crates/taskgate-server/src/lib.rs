//! taskgate Server Library
//!
//! HTTP front end for the dispatcher: configuration, shared state, metrics
//! and the axum router.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod state;

pub use config::{Args, Config};
pub use error::StartupError;
pub use state::AppState;

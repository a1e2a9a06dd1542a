//! Filesystem sandbox for taskgate.
//!
//! Every path handed to an executor is untrusted. This crate is the single
//! place where such paths become real filesystem locations:
//!
//! - [`PathResolver`] turns an input path into a [`ResolvedPath`] that lies
//!   strictly below one of the configured roots.
//! - [`Storage`] reads and writes text and JSON through the resolver,
//!   re-checking the resolution immediately before each open and enforcing
//!   a size ceiling.
//!
//! # Example
//!
//! ```rust,no_run
//! use taskgate_sandbox::{SandboxConfig, Storage};
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Storage::new(&SandboxConfig::default())?;
//!     storage.write("/data/out/hello.txt", "hi").await?;
//!     assert_eq!(storage.read("out/hello.txt").await?, "hi");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod resolver;
mod storage;

pub use config::{SandboxConfig, DEFAULT_DATA_DIR, DEFAULT_MAX_FILE_SIZE};
pub use error::SandboxError;
pub use resolver::{PathResolver, ResolvedPath};
pub use storage::{DirEntryInfo, Storage};

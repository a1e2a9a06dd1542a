//! Sandbox configuration.

use std::path::PathBuf;

/// Default sandbox root.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Default content size ceiling (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Sandbox configuration, read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Absolute directories all file access is confined to. The first one is
    /// the primary root that relative paths are interpreted against.
    pub allowed_roots: Vec<PathBuf>,

    /// Maximum size in bytes of any single read or write.
    pub max_file_size: u64,
}

impl SandboxConfig {
    /// Create a config confined to a single root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            allowed_roots: vec![root.into()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Builder method to add another allowed root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.allowed_roots.push(root.into());
        self
    }

    /// Builder method to set the size ceiling.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

//! Sandboxed path resolution.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SandboxError;

/// An absolute, canonical path that lay strictly below an allowed root when
/// it was resolved.
///
/// The guarantee holds only at resolution time. Callers re-check it with
/// [`PathResolver::revalidate`] right before use and never store it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    root: PathBuf,
}

impl ResolvedPath {
    /// The absolute filesystem path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// The allowed root this path lies under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to its root, for user-facing messages.
    pub fn relative(&self) -> &Path {
        self.path.strip_prefix(&self.root).unwrap_or(Path::new(""))
    }

    /// Relative path as a display string.
    pub fn display_name(&self) -> String {
        self.relative().display().to_string()
    }
}

/// Resolves input paths against a fixed allow-list of roots.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical roots; the first is the primary root.
    roots: Vec<PathBuf>,
}

impl PathResolver {
    /// Create a resolver over the given roots.
    ///
    /// Each root must be an absolute path to an existing directory. Roots
    /// are canonicalized once here.
    pub fn new<P: AsRef<Path>>(roots: &[P]) -> Result<Self, SandboxError> {
        if roots.is_empty() {
            return Err(SandboxError::InvalidRoot(
                "at least one allowed root is required".to_string(),
            ));
        }

        let mut canonical = Vec::with_capacity(roots.len());
        for root in roots {
            let root = root.as_ref();
            if !root.is_absolute() {
                return Err(SandboxError::InvalidRoot(format!(
                    "'{}' is not absolute",
                    root.display()
                )));
            }
            let resolved = fs::canonicalize(root).map_err(|e| {
                SandboxError::InvalidRoot(format!("'{}': {}", root.display(), e))
            })?;
            if !resolved.is_dir() {
                return Err(SandboxError::InvalidRoot(format!(
                    "'{}' is not a directory",
                    root.display()
                )));
            }
            canonical.push(resolved);
        }

        Ok(Self { roots: canonical })
    }

    /// Canonical allowed roots.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve an input path.
    ///
    /// Relative inputs are taken against the primary root. Fails with
    /// [`SandboxError::PathViolation`] when the input contains a raw `..`
    /// segment, or when after expanding `.` and symlinks it does not lie
    /// strictly below an allowed root.
    pub fn resolve(&self, input: impl AsRef<Path>) -> Result<ResolvedPath, SandboxError> {
        let input = input.as_ref();

        if input.as_os_str().is_empty() {
            return Err(SandboxError::PathViolation("empty path".to_string()));
        }

        // Rejected even when normalization would land inside a root.
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            warn!("Rejected path with parent directory segment");
            return Err(SandboxError::PathViolation(
                "parent directory segments are not allowed".to_string(),
            ));
        }

        let absolute: PathBuf = if input.is_absolute() {
            input.components().collect()
        } else {
            self.roots[0].join(input).components().collect()
        };

        let normalized = normalize(&absolute)?;

        match self
            .roots
            .iter()
            .find(|root| normalized.starts_with(root) && normalized != **root)
        {
            Some(root) => {
                debug!(path = %normalized.display(), "Resolved sandbox path");
                Ok(ResolvedPath {
                    root: root.clone(),
                    path: normalized,
                })
            }
            None => {
                warn!("Rejected path outside allowed roots");
                Err(SandboxError::PathViolation(
                    "not below an allowed directory".to_string(),
                ))
            }
        }
    }

    /// Re-run resolution for a previously resolved path.
    ///
    /// Fails if the path no longer resolves, or now resolves somewhere else
    /// (for example because a component was swapped for a symlink).
    pub fn revalidate(&self, resolved: &ResolvedPath) -> Result<(), SandboxError> {
        let again = self.resolve(&resolved.path)?;
        if again != *resolved {
            warn!("Path changed between resolution and use");
            return Err(SandboxError::PathViolation(
                "path changed during access".to_string(),
            ));
        }
        Ok(())
    }
}

/// Canonicalize the longest existing ancestor of `path` and append the rest.
///
/// The non-existent tail holds no `..` (rejected earlier) and no symlinks
/// (it does not exist yet), so appending it cannot leave the canonical prefix.
fn normalize(path: &Path) -> Result<PathBuf, SandboxError> {
    let mut existing = path;
    let mut tail: Vec<OsString> = Vec::new();

    loop {
        match fs::canonicalize(existing) {
            Ok(mut canonical) => {
                for part in tail.iter().rev() {
                    canonical.push(part);
                }
                return Ok(canonical);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // A dangling symlink is "not found" for canonicalize but
                // would be followed on write.
                if fs::symlink_metadata(existing).is_ok() {
                    return Err(SandboxError::PathViolation(
                        "dangling symbolic link".to_string(),
                    ));
                }
                let name = existing.file_name().ok_or_else(|| {
                    SandboxError::PathViolation("path has no existing ancestor".to_string())
                })?;
                tail.push(name.to_os_string());
                existing = existing.parent().ok_or_else(|| {
                    SandboxError::PathViolation("path has no existing ancestor".to_string())
                })?;
            }
            Err(e) => return Err(SandboxError::io(e)),
        }
    }
}

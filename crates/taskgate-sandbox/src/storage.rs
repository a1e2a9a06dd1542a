//! Text and JSON storage confined to the sandbox.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::resolver::{PathResolver, ResolvedPath};

/// One entry returned by [`Storage::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// Absolute sandbox path, usable with the other storage methods.
    pub path: String,
    /// Path relative to the listed directory, `/`-separated.
    pub relative: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes.
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Reads and writes content through the path resolver.
///
/// Every call resolves its path afresh and re-validates it right before the
/// file is opened. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Storage {
    resolver: PathResolver,
    max_file_size: u64,
}

impl Storage {
    /// Create storage from a sandbox configuration.
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let resolver = PathResolver::new(&config.allowed_roots)?;
        info!(
            roots = ?resolver.roots(),
            max_file_size = config.max_file_size,
            "Sandbox storage ready"
        );
        Ok(Self {
            resolver,
            max_file_size: config.max_file_size,
        })
    }

    /// The underlying path resolver.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Maximum bytes per read or write.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Read a file as UTF-8 text.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<String, SandboxError> {
        let resolved = self.resolve_existing_file(path.as_ref()).await?;

        self.resolver.revalidate(&resolved)?;
        let file = fs::File::open(resolved.as_path())
            .await
            .map_err(|e| not_found_or_io(e, &resolved))?;

        // Bound the read even if the file grew after the metadata check.
        let mut buf = Vec::new();
        file.take(self.max_file_size + 1)
            .read_to_end(&mut buf)
            .await
            .map_err(SandboxError::io)?;
        if buf.len() as u64 > self.max_file_size {
            return Err(SandboxError::SizeLimitExceeded {
                size: buf.len() as u64,
                limit: self.max_file_size,
            });
        }

        debug!(path = %resolved.display_name(), bytes = buf.len(), "Read file");
        String::from_utf8(buf).map_err(|_| {
            SandboxError::MalformedData(format!("{} is not valid UTF-8 text", resolved.display_name()))
        })
    }

    /// Write text to a file, creating parent directories inside the sandbox.
    ///
    /// The content goes to a temporary sibling first and is renamed into
    /// place, so a failed write leaves no partial target file. Oversized
    /// content is rejected before anything touches disk.
    pub async fn write(&self, path: impl AsRef<Path>, content: &str) -> Result<(), SandboxError> {
        let resolved = self.resolver.resolve(path.as_ref())?;

        let size = content.len() as u64;
        if size > self.max_file_size {
            warn!(path = %resolved.display_name(), size, "Write exceeds size limit");
            return Err(SandboxError::SizeLimitExceeded {
                size,
                limit: self.max_file_size,
            });
        }

        let target = resolved.as_path();
        if fs::metadata(target).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(SandboxError::MalformedData(format!(
                "{} is a directory",
                resolved.display_name()
            )));
        }

        // `resolved` is strictly below its root, so its parent is the root
        // or a directory beneath it.
        let parent = target
            .parent()
            .ok_or_else(|| SandboxError::PathViolation("path has no parent".to_string()))?;

        self.resolver.revalidate(&resolved)?;
        if let Some(dirs) = resolved.relative().parent() {
            create_dirs_beneath(resolved.root(), dirs).await?;
        }
        self.resolver.revalidate(&resolved)?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = fs::write(&tmp, content.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SandboxError::io(e));
        }
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(SandboxError::io(e));
        }

        debug!(path = %resolved.display_name(), bytes = size, "Wrote file");
        Ok(())
    }

    /// Read and parse a JSON file.
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<T, SandboxError> {
        let path = path.as_ref();
        let content = self.read(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            SandboxError::MalformedData(format!("invalid JSON (line {}, column {})", e.line(), e.column()))
        })
    }

    /// Serialize a value as pretty-printed JSON and write it.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> Result<(), SandboxError> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| SandboxError::MalformedData(format!("value is not representable as JSON: {e}")))?;
        self.write(path, &content).await
    }

    /// List a directory, optionally recursing into subdirectories.
    ///
    /// Entries that resolve outside the sandbox (symlinks pointing out) are
    /// skipped. Symlinked directories are not descended into. Results are
    /// sorted by relative path.
    pub async fn list_dir(
        &self,
        path: impl AsRef<Path>,
        recursive: bool,
    ) -> Result<Vec<DirEntryInfo>, SandboxError> {
        let base = self.resolver.resolve(path.as_ref())?;
        let meta = fs::metadata(base.as_path())
            .await
            .map_err(|e| not_found_or_io(e, &base))?;
        if !meta.is_dir() {
            return Err(SandboxError::NotFound(format!(
                "{} is not a directory",
                base.display_name()
            )));
        }

        let mut entries = Vec::new();
        let mut pending = vec![base.as_path().to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut reader = fs::read_dir(&dir).await.map_err(SandboxError::io)?;
            while let Some(entry) = reader.next_entry().await.map_err(SandboxError::io)? {
                let file_type = entry.file_type().await.map_err(SandboxError::io)?;
                let resolved = match self.resolver.resolve(entry.path()) {
                    Ok(resolved) => resolved,
                    Err(_) => {
                        warn!("Skipping directory entry outside the sandbox");
                        continue;
                    }
                };
                let meta = match fs::metadata(resolved.as_path()).await {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };

                if recursive && file_type.is_dir() {
                    pending.push(entry.path());
                }

                let relative = entry
                    .path()
                    .strip_prefix(base.as_path())
                    .map(|p| {
                        p.components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                    .unwrap_or_default();

                entries.push(DirEntryInfo {
                    path: resolved.as_path().to_string_lossy().into_owned(),
                    relative,
                    is_dir: meta.is_dir(),
                    len: meta.len(),
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            }
        }

        entries.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(entries)
    }

    /// Metadata of an existing path inside the sandbox.
    pub async fn metadata(&self, path: impl AsRef<Path>) -> Result<std::fs::Metadata, SandboxError> {
        let resolved = self.resolver.resolve(path.as_ref())?;
        fs::metadata(resolved.as_path())
            .await
            .map_err(|e| not_found_or_io(e, &resolved))
    }

    /// Resolve an existing regular file for direct opening by a caller
    /// (for example a database driver).
    ///
    /// The file is re-validated before returning; the caller must open it
    /// immediately.
    pub async fn resolve_for_open(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ResolvedPath, SandboxError> {
        let resolved = self.resolve_existing_file(path.as_ref()).await?;
        self.resolver.revalidate(&resolved)?;
        Ok(resolved)
    }

    async fn resolve_existing_file(&self, path: &Path) -> Result<ResolvedPath, SandboxError> {
        let resolved = self.resolver.resolve(path)?;
        let meta = fs::metadata(resolved.as_path())
            .await
            .map_err(|e| not_found_or_io(e, &resolved))?;

        if !meta.is_file() {
            return Err(SandboxError::NotFound(format!(
                "{} is not a file",
                resolved.display_name()
            )));
        }
        if meta.len() > self.max_file_size {
            return Err(SandboxError::SizeLimitExceeded {
                size: meta.len(),
                limit: self.max_file_size,
            });
        }
        Ok(resolved)
    }
}

fn not_found_or_io(err: io::Error, resolved: &ResolvedPath) -> SandboxError {
    if err.kind() == io::ErrorKind::NotFound {
        SandboxError::NotFound(format!("{} does not exist", resolved.display_name()))
    } else {
        SandboxError::io(err)
    }
}

/// Create `relative` below `root` one component at a time.
///
/// A resolved path is canonical, so every existing component must be a real
/// directory. A symlink means the tree changed after resolution and is
/// refused instead of followed.
async fn create_dirs_beneath(root: &Path, relative: &Path) -> Result<(), SandboxError> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        let name = || current.strip_prefix(root).unwrap_or(relative).display().to_string();

        match fs::symlink_metadata(&current).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                warn!(path = %name(), "Refusing to create directories through a symbolic link");
                return Err(SandboxError::PathViolation(
                    "path changed during access".to_string(),
                ));
            }
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(SandboxError::MalformedData(format!(
                    "{} is not a directory",
                    name()
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match fs::create_dir(&current).await {
                    Ok(()) => debug!(path = %name(), "Created directory"),
                    // Lost a race; the next iteration checks what is there.
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                        let meta = fs::symlink_metadata(&current)
                            .await
                            .map_err(SandboxError::io)?;
                        if !meta.is_dir() {
                            return Err(SandboxError::PathViolation(
                                "path changed during access".to_string(),
                            ));
                        }
                    }
                    Err(e) => return Err(SandboxError::io(e)),
                }
            }
            Err(e) => return Err(SandboxError::io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(&SandboxConfig::new(dir.path())).unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (dir, storage) = storage();
        let path = dir.path().join("nested/deeper/out.txt");

        storage.write(&path, "hello").await.unwrap();
        assert_eq!(storage.read(&path).await.unwrap(), "hello");
        assert!(dir.path().join("nested/deeper").is_dir());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (_dir, storage) = storage();
        storage.write("out.txt", "first version").await.unwrap();
        storage.write("out.txt", "2").await.unwrap();
        assert_eq!(storage.read("out.txt").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (_dir, storage) = storage();
        let err = storage.read("missing.txt").await.unwrap_err();
        match err {
            SandboxError::NotFound(msg) => assert_eq!(msg, "missing.txt does not exist"),
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_traversal_is_rejected() {
        let (_dir, storage) = storage();
        let err = storage.read("/data/../etc/passwd").await.unwrap_err();
        assert!(matches!(err, SandboxError::PathViolation(_)));
    }

    #[tokio::test]
    async fn test_write_outside_is_rejected() {
        let (_dir, storage) = storage();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("x.txt");

        let err = storage.write(&target, "x").await.unwrap_err();
        assert!(matches!(err, SandboxError::PathViolation(_)));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_oversized_write_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let storage =
            Storage::new(&SandboxConfig::new(dir.path()).with_max_file_size(8)).unwrap();

        let err = storage
            .write("sub/big.txt", "123456789")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SandboxError::SizeLimitExceeded { size: 9, limit: 8 }
        ));
        assert!(!dir.path().join("sub/big.txt").exists());
        assert!(!dir.path().join("sub").exists());
    }

    #[tokio::test]
    async fn test_oversized_write_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let storage =
            Storage::new(&SandboxConfig::new(dir.path()).with_max_file_size(4)).unwrap();

        storage.write("a.txt", "ok").await.unwrap();
        assert!(storage.write("a.txt", "too long").await.is_err());
        assert_eq!(storage.read("a.txt").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_oversized_read_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        let storage =
            Storage::new(&SandboxConfig::new(dir.path()).with_max_file_size(5)).unwrap();

        let err = storage.read("big.txt").await.unwrap_err();
        assert!(matches!(err, SandboxError::SizeLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_non_utf8_is_malformed() {
        let (dir, storage) = storage();
        std::fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00]).unwrap();
        let err = storage.read("bin.dat").await.unwrap_err();
        assert!(matches!(err, SandboxError::MalformedData(_)));
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let (_dir, storage) = storage();
        let records = [
            json!({"name": "Ada", "tags": ["a", "b"], "age": 36, "ratio": 0.1}),
            json!([1, 2.5, -3, null, true, "text with \"quotes\" and ünïcödé"]),
            json!({"nested": {"deep": {"empty": {}, "list": []}}, "big": 1.7976931348623157e308}),
            json!("just a string"),
        ];

        for record in records {
            storage.write_json("r.json", &record).await.unwrap();
            let back: Value = storage.read_json("r.json").await.unwrap();
            assert_eq!(back, record);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let (_dir, storage) = storage();
        storage.write("bad.json", "{not json").await.unwrap();
        let err = storage.read_json::<Value>("bad.json").await.unwrap_err();
        assert!(matches!(err, SandboxError::MalformedData(_)));
    }

    #[tokio::test]
    async fn test_write_to_directory_fails() {
        let (dir, storage) = storage();
        std::fs::create_dir(dir.path().join("folder")).unwrap();
        assert!(storage.write("folder", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_list_dir() {
        let (dir, storage) = storage();
        std::fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("docs/sub/b.md"), "# B").unwrap();

        let flat = storage.list_dir("docs", false).await.unwrap();
        let names: Vec<_> = flat.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(names, vec!["a.md", "sub"]);

        let deep = storage.list_dir("docs", true).await.unwrap();
        let files: Vec<_> = deep
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.relative.as_str())
            .collect();
        assert_eq!(files, vec!["a.md", "sub/b.md"]);

        // Returned paths are usable with the other methods.
        let b = deep.iter().find(|e| e.relative == "sub/b.md").unwrap();
        assert_eq!(storage.read(&b.path).await.unwrap(), "# B");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_dir_skips_links_out() {
        let (dir, storage) = storage();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::fs::create_dir(dir.path().join("logs")).unwrap();
        std::fs::write(dir.path().join("logs/a.log"), "a").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("logs/b.log"),
        )
        .unwrap();

        let entries = storage.list_dir("logs", false).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(names, vec!["a.log"]);
    }

    #[tokio::test]
    async fn test_resolve_for_open_requires_file() {
        let (dir, storage) = storage();
        std::fs::write(dir.path().join("db.sqlite"), "").unwrap();

        let resolved = storage.resolve_for_open("db.sqlite").await.unwrap();
        assert_eq!(resolved.display_name(), "db.sqlite");
        assert!(matches!(
            storage.resolve_for_open("nope.sqlite").await,
            Err(SandboxError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_write_creates_missing_parents() {
        let (dir, storage) = storage();
        std::fs::create_dir(dir.path().join("reports")).unwrap();

        storage.write("reports/2024/q1/summary.txt", "ok").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("reports/2024/q1/summary.txt")).unwrap(),
            "ok"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_swapped_parent_creates_nothing_outside() {
        let (dir, storage) = storage();
        let outside = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("r")).unwrap();

        let resolved = storage
            .resolver()
            .resolve(dir.path().join("r/a/b/out.txt"))
            .unwrap();

        // Replace the directory with a link out of the sandbox.
        std::fs::remove_dir(dir.path().join("r")).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("r")).unwrap();

        let err = create_dirs_beneath(resolved.root(), resolved.relative().parent().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::PathViolation(_)));
        assert!(!outside.path().join("a").exists());

        let err = storage.write("r/a/b/out.txt", "x").await.unwrap_err();
        assert!(matches!(err, SandboxError::PathViolation(_)));
        assert!(!outside.path().join("a").exists());
        assert!(!outside.path().join("a/b/out.txt").exists());
    }

    #[tokio::test]
    async fn test_file_in_parent_position_is_rejected() {
        let (dir, storage) = storage();
        std::fs::write(dir.path().join("notes"), "plain file").unwrap();

        let err = create_dirs_beneath(dir.path(), Path::new("notes/sub"))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::MalformedData(_)));
    }
}

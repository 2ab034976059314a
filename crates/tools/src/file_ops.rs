//! File management sandboxed to a root directory
//!
//! Every user-supplied path is relative to the configured root. Absolute
//! paths and `..` components are refused before touching the filesystem.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use shadow_config::FileOpsConfig;
use shadow_core::{CapabilityResult, FileAction, FileOps, Result};

use crate::CapabilityError;

const MAX_LISTED: usize = 50;
const MAX_SEARCH_RESULTS: usize = 20;
const MAX_SEARCH_DEPTH: usize = 5;

/// File operations on the local disk
#[derive(Debug, Clone)]
pub struct LocalFileOps {
    root: PathBuf,
    max_read_bytes: usize,
}

impl LocalFileOps {
    pub fn new(config: &FileOpsConfig) -> Self {
        Self::with_root(&config.root, config.max_read_bytes)
    }

    pub fn with_root(root: impl AsRef<Path>, max_read_bytes: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_read_bytes,
        }
    }

    /// Resolve a relative path inside the sandbox
    fn resolve(&self, relative: &str) -> std::result::Result<PathBuf, CapabilityError> {
        let relative = relative.trim();
        let path = Path::new(relative);
        for component in path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(CapabilityError::not_permitted(format!(
                        "'{}' is outside the allowed folder",
                        relative
                    )))
                }
            }
        }
        Ok(self.root.join(path))
    }

    async fn list(&self, dir: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let path = self.resolve(dir)?;
        let mut entries = tokio::fs::read_dir(&path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();

        if names.is_empty() {
            return Ok(CapabilityResult::ok("The folder is empty."));
        }
        let total = names.len();
        names.truncate(MAX_LISTED);
        let mut message = names.join("\n");
        if total > MAX_LISTED {
            message.push_str(&format!("\n... and {} more", total - MAX_LISTED));
        }
        Ok(CapabilityResult::ok(message))
    }

    async fn read(&self, file: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let path = self.resolve(file)?;
        let handle = tokio::fs::File::open(&path).await?;
        let mut buf = Vec::with_capacity(self.max_read_bytes.min(64 * 1024));
        handle.take(self.max_read_bytes as u64).read_to_end(&mut buf).await?;
        Ok(CapabilityResult::ok(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn search(&self, pattern: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        let needle = pattern.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CapabilityError::invalid_params("what should I look for?"));
        }

        let mut found = Vec::new();
        let mut pending = vec![(self.root.clone(), 0usize)];
        while let Some((dir, depth)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable folder");
                    continue;
                }
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    if depth < MAX_SEARCH_DEPTH {
                        pending.push((path, depth + 1));
                    }
                    continue;
                }
                if entry.file_name().to_string_lossy().to_lowercase().contains(&needle) {
                    let shown = path.strip_prefix(&self.root).unwrap_or(&path);
                    found.push(shown.display().to_string());
                    if found.len() >= MAX_SEARCH_RESULTS {
                        break;
                    }
                }
            }
            if found.len() >= MAX_SEARCH_RESULTS {
                break;
            }
        }

        found.sort();
        Ok(if found.is_empty() {
            CapabilityResult::failure(format!("No files matching '{}'", pattern.trim()))
        } else {
            CapabilityResult::ok(found.join("\n"))
        })
    }

    async fn create(&self, file: &str, contents: &str) -> std::result::Result<CapabilityResult, CapabilityError> {
        if file.trim().is_empty() {
            return Err(CapabilityError::invalid_params("what should the file be called?"));
        }
        let path = self.resolve(file)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut handle = match created {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(CapabilityResult::failure(format!("{} already exists", file.trim())));
            }
            Err(e) => return Err(e.into()),
        };
        tokio::io::AsyncWriteExt::write_all(&mut handle, contents.as_bytes()).await?;
        Ok(CapabilityResult::ok(format!("Created {}.", file.trim())))
    }
}

#[async_trait]
impl FileOps for LocalFileOps {
    async fn run(&self, action: FileAction) -> Result<CapabilityResult> {
        tracing::debug!(?action, "File operation");
        let result = match &action {
            FileAction::List { dir } => self.list(dir).await,
            FileAction::Read { path } => self.read(path).await,
            FileAction::Search { pattern } => self.search(pattern).await,
            FileAction::Create { path, contents } => self.create(path, contents).await,
        };

        match result {
            Err(CapabilityError::NotPermitted(reason)) => {
                tracing::warn!(%reason, "File operation refused");
                Ok(CapabilityResult::failure(reason))
            }
            Err(CapabilityError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(CapabilityResult::failure("That file or folder doesn't exist."))
            }
            other => Ok(other?),
        }
    }
}

/// File operations used when file access is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpFileOps;

#[async_trait]
impl FileOps for NoOpFileOps {
    async fn run(&self, _action: FileAction) -> Result<CapabilityResult> {
        Ok(CapabilityResult::failure("File access is not enabled."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, LocalFileOps) {
        let dir = TempDir::new().unwrap();
        let ops = LocalFileOps::with_root(dir.path(), 16);
        (dir, ops)
    }

    #[tokio::test]
    async fn test_create_then_read_and_list() {
        let (_dir, ops) = sandbox();
        let created = ops
            .run(FileAction::Create {
                path: "notes/todo.txt".into(),
                contents: "buy milk and eggs and bread".into(),
            })
            .await
            .unwrap();
        assert!(created.success);

        let read = ops.run(FileAction::Read { path: "notes/todo.txt".into() }).await.unwrap();
        // Truncated to max_read_bytes
        assert_eq!(read.message, "buy milk and egg");

        let listed = ops.run(FileAction::List { dir: ".".into() }).await.unwrap();
        assert_eq!(listed.message, "notes/");
    }

    #[tokio::test]
    async fn test_create_refuses_overwrite() {
        let (_dir, ops) = sandbox();
        let action = FileAction::Create {
            path: "a.txt".into(),
            contents: "1".into(),
        };
        assert!(ops.run(action.clone()).await.unwrap().success);
        assert!(!ops.run(action).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_escape_is_refused() {
        let (_dir, ops) = sandbox();
        for path in ["../secret", "/etc/passwd", "a/../../b"] {
            let result = ops.run(FileAction::Read { path: path.into() }).await.unwrap();
            assert!(!result.success, "{path} should be refused");
        }
    }

    #[tokio::test]
    async fn test_search_is_recursive_and_case_insensitive() {
        let (dir, ops) = sandbox();
        std::fs::create_dir_all(dir.path().join("docs/old")).unwrap();
        std::fs::write(dir.path().join("docs/old/Report-2024.txt"), "x").unwrap();
        std::fs::write(dir.path().join("readme.md"), "x").unwrap();

        let found = ops.run(FileAction::Search { pattern: "report".into() }).await.unwrap();
        assert!(found.success);
        assert!(found.message.contains("Report-2024.txt"));
        assert!(!found.message.contains("readme"));
    }

    #[tokio::test]
    async fn test_missing_file_is_soft_failure() {
        let (_dir, ops) = sandbox();
        let result = ops.run(FileAction::Read { path: "nope.txt".into() }).await.unwrap();
        assert!(!result.success);
    }
}

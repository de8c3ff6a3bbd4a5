//! 本地文件系统实现
//!
//! 基于 `tokio::fs`。写入先落到同目录的 `.tmp` 文件再 rename，
//! 读方只会看到完整的旧文件或完整的新文件。

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::backend::{DirEntry, EntryKind, FileMetadata, FileSystem};

/// 本地文件系统
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn temp_path_for(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    async fn write_then_rename(path: &Path, data: &[u8]) -> io::Result<()> {
        let tmp_path = Self::temp_path_for(path);
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
}

fn kind_of(meta: &std::fs::Metadata) -> EntryKind {
    if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let result = Self::write_then_rename(path, data).await;
        if result.is_err() {
            let _ = fs::remove_file(Self::temp_path_for(path)).await;
        }
        result
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(from, to).await
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if meta.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        }
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut read_dir = match fs::read_dir(path).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e),
        };
        while let Some(entry) = read_dir.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = fs::metadata(path).await?;
        let modified_at = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64);
        Ok(FileMetadata {
            size: meta.len(),
            modified_at,
            kind: kind_of(&meta),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("a").join("b").join("manifest.json");

        fs.write(&path, b"{}").await.unwrap();

        assert_eq!(fs.read(&path).await.unwrap(), b"{}");
        let names: Vec<String> = fs
            .list_dir(path.parent().unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["manifest.json".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        fs.delete(&dir.path().join("nope")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_is_recursive() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let nested = dir.path().join("set").join("images");
        fs.mkdir(&nested).await.unwrap();
        fs.write(&nested.join("x.png"), b"png").await.unwrap();

        fs.delete(&dir.path().join("set")).await.unwrap();
        assert!(!fs.exists(&dir.path().join("set")).await);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let entries = fs.list_dir(&dir.path().join("missing")).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let result = fs
            .copy(&dir.path().join("missing.png"), &dir.path().join("out.png"))
            .await;
        assert!(result.is_err());
    }
}

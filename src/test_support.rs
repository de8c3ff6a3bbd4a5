//! 测试辅助：可注入故障的文件系统

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::storage::{DirEntry, FileMetadata, FileSystem, LocalFileSystem};

/// 包装 [`LocalFileSystem`]，按规则让部分操作失败
#[derive(Default)]
pub(crate) struct FlakyFileSystem {
    inner: LocalFileSystem,
    deny_write_prefixes: Vec<PathBuf>,
    fail_copy_from: HashSet<PathBuf>,
    fail_deletes: bool,
}

impl FlakyFileSystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 拒绝该目录下的 mkdir / write / copy 目标
    pub(crate) fn deny_writes_under(mut self, prefix: &Path) -> Self {
        self.deny_write_prefixes.push(prefix.to_path_buf());
        self
    }

    /// 从该源路径复制时失败
    pub(crate) fn fail_copy_from(mut self, source: &Path) -> Self {
        self.fail_copy_from.insert(source.to_path_buf());
        self
    }

    /// 所有删除操作失败
    pub(crate) fn fail_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self
            .deny_write_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write denied: {}", path.display()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for FlakyFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.check_writable(path)?;
        self.inner.write(path, data).await
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        self.check_writable(path)?;
        self.inner.mkdir(path).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        self.check_writable(to)?;
        if self.fail_copy_from.contains(from) {
            return Err(io::Error::other(format!("copy failed: {}", from.display())));
        }
        self.inner.copy(from, to).await
    }

    async fn delete(&self, path: &Path) -> io::Result<()> {
        if self.fail_deletes {
            return Err(io::Error::other(format!("delete failed: {}", path.display())));
        }
        self.inner.delete(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.list_dir(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        self.inner.metadata(path).await
    }
}

//! 文件系统能力接口
//!
//! 核心逻辑只通过这组异步原语访问磁盘，所有路径均为绝对路径。
//! 实现方可以是本地文件系统，也可以是宿主提供的其他存储。

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// 目录项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// 目录列表中的单个条目
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// 文件名（不含父路径）
    pub name: String,
    /// 绝对路径
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// 文件元数据
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// 文件大小（字节）
    pub size: u64,
    /// 修改时间（Unix 时间戳，毫秒），不支持时为 None
    pub modified_at: Option<i64>,
    pub kind: EntryKind,
}

/// 文件系统能力
///
/// 每个操作都可能以普通 I/O 错误失败，由调用方决定是否可以容忍。
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// 路径是否存在
    async fn exists(&self, path: &Path) -> bool;

    /// 读取完整文件内容
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// 整体覆盖写入文件
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// 递归创建目录
    async fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// 复制文件，返回复制的字节数
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// 递归删除文件或目录。路径不存在时返回 Ok
    async fn delete(&self, path: &Path) -> io::Result<()>;

    /// 列出目录内容。目录不存在时返回空列表
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// 获取元数据
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;
}

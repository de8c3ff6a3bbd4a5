//! 存储层
//!
//! - `backend`: 核心依赖的文件系统能力接口
//! - `local`: 基于 tokio 的本地实现
//! - `locator`: 存储根目录解析与回退

mod backend;
mod local;
mod locator;

pub use backend::{DirEntry, EntryKind, FileMetadata, FileSystem};
pub use local::LocalFileSystem;
pub use locator::{ResolvedRoot, StorageLocator};

//! 键值存储

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::storage::{FileSystem, StorageLocator};

/// 字符串键值存储
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: String) -> io::Result<()>;

    /// 删除键，键不存在时返回 Ok
    async fn remove(&self, key: &str) -> io::Result<()>;

    async fn keys(&self) -> Vec<String>;
}

/// 内存键值存储
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    async fn set(&self, key: &str, value: String) -> io::Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

/// 文件位置
enum Location {
    /// 固定路径
    Fixed(PathBuf),
    /// 存储根目录下的文件，随根目录重新解析而变化
    UnderRoot {
        locator: Arc<StorageLocator>,
        file_name: String,
    },
}

/// 单个 JSON 文件的键值存储
///
/// 每次修改都整体读写文件；进程内由互斥锁串行化。
pub struct FileKeyValueStore {
    fs: Arc<dyn FileSystem>,
    location: Location,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// 使用固定路径
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self::with_location(fs, Location::Fixed(path))
    }

    /// 位于存储根目录下，写入失败后跟随定位器切换到新的根目录
    pub fn under_root(
        fs: Arc<dyn FileSystem>,
        locator: Arc<StorageLocator>,
        file_name: impl Into<String>,
    ) -> Self {
        Self::with_location(
            fs,
            Location::UnderRoot {
                locator,
                file_name: file_name.into(),
            },
        )
    }

    fn with_location(fs: Arc<dyn FileSystem>, location: Location) -> Self {
        Self {
            fs,
            location,
            lock: Mutex::new(()),
        }
    }

    /// 当前文件路径
    pub async fn path(&self) -> PathBuf {
        match &self.location {
            Location::Fixed(path) => path.clone(),
            Location::UnderRoot { locator, file_name } => {
                locator.active_root().await.join(file_name)
            }
        }
    }

    async fn load(&self) -> BTreeMap<String, String> {
        let path = self.path().await;
        let Ok(bytes) = self.fs.read(&path).await else {
            return BTreeMap::new();
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!("[Drafts] 草稿文件损坏，重置为空 {:?}: {}", path, e);
            BTreeMap::new()
        })
    }

    async fn store(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let content = serde_json::to_vec_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let path = self.path().await;
        let result = self.fs.write(&path, &content).await;
        if let (Err(e), Location::UnderRoot { locator, .. }) = (&result, &self.location) {
            tracing::warn!("[Drafts] 写入草稿文件失败 {:?}: {}", path, e);
            locator.invalidate();
        }
        result
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.load().await.remove(key)
    }

    async fn set(&self, key: &str, value: String) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await;
        entries.insert(key.to_string(), value);
        self.store(&entries).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.store(&entries).await
    }

    async fn keys(&self) -> Vec<String> {
        self.load().await.into_keys().collect()
    }
}

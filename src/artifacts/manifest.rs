//! 产物清单存储
//!
//! 清单保存在 `<root>/manifest.json`，整体读、整体写，后写者覆盖。
//! 文件缺失或损坏时视为空清单，不向调用方报错。

use std::path::PathBuf;
use std::sync::Arc;

use super::types::Manifest;
use crate::error::Result;
use crate::storage::{FileSystem, StorageLocator};

/// 清单文件名
pub const MANIFEST_FILE: &str = "manifest.json";

/// 清单存储
pub struct ManifestStore {
    fs: Arc<dyn FileSystem>,
    locator: Arc<StorageLocator>,
}

impl ManifestStore {
    pub fn new(fs: Arc<dyn FileSystem>, locator: Arc<StorageLocator>) -> Self {
        Self { fs, locator }
    }

    /// 当前根目录下的清单路径
    pub async fn path(&self) -> PathBuf {
        self.locator.active_root().await.join(MANIFEST_FILE)
    }

    /// 读取清单
    pub async fn read(&self) -> Manifest {
        let path = self.path().await;
        let bytes = match self.fs.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("[ManifestStore] 清单不可读，视为空清单 {:?}: {}", path, e);
                return Manifest::default();
            }
        };
        match serde_json::from_slice::<Manifest>(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!("[ManifestStore] 清单解析失败，视为空清单 {:?}: {}", path, e);
                Manifest::default()
            }
        }
    }

    /// 整体覆盖写入清单
    pub async fn write(&self, manifest: &Manifest) -> Result<()> {
        let root = self.locator.active_root().await;
        let content = serde_json::to_vec_pretty(manifest)?;
        let path = root.join(MANIFEST_FILE);

        let result = match self.fs.mkdir(&root).await {
            Ok(()) => self.fs.write(&path, &content).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!("[ManifestStore] 写入清单失败 {:?}: {}", path, e);
            self.locator.invalidate();
            return Err(e.into());
        }

        tracing::debug!(
            "[ManifestStore] 写入清单: {:?} ({} 条记录)",
            path,
            manifest.files.len()
        );
        Ok(())
    }
}

//! 存储根目录定位
//!
//! 优先使用主目录（默认 `~/.specdraft/artifacts`），写入探测失败时
//! 回退到系统临时目录下的固定子路径。解析结果会被缓存，直到调用方
//! 在写入失败后调用 [`StorageLocator::invalidate`]。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::backend::FileSystem;
use crate::config::{expand_tilde, StorageConfig};

/// 写入探测文件名
const WRITE_TEST_FILE: &str = ".write-test";

/// 解析得到的存储根目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    /// 根目录绝对路径
    pub path: PathBuf,
    /// 是否使用了回退目录
    pub is_fallback: bool,
}

/// 存储根目录定位器
pub struct StorageLocator {
    fs: Arc<dyn FileSystem>,
    primary: PathBuf,
    fallback: PathBuf,
    active: RwLock<Option<ResolvedRoot>>,
}

impl StorageLocator {
    /// 使用指定的主目录和回退目录创建定位器
    pub fn new(fs: Arc<dyn FileSystem>, primary: PathBuf, fallback: PathBuf) -> Self {
        Self {
            fs,
            primary,
            fallback,
            active: RwLock::new(None),
        }
    }

    /// 根据配置创建定位器
    pub fn from_config(fs: Arc<dyn FileSystem>, config: &StorageConfig) -> Self {
        let primary = match config.primary_root.as_deref() {
            Some(p) if !p.trim().is_empty() => expand_tilde(p),
            _ => Self::default_primary_root(),
        };
        let fallback = std::env::temp_dir().join(&config.fallback_subpath);
        Self::new(fs, primary, fallback)
    }

    /// 默认主目录
    pub fn default_primary_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".specdraft")
            .join("artifacts")
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn fallback(&self) -> &Path {
        &self.fallback
    }

    /// 重新解析存储根目录
    ///
    /// 回退目录同样探测失败时仍然返回回退目录，失败推迟到第一次实际写入。
    pub async fn resolve_root(&self) -> ResolvedRoot {
        let resolved = if self.probe(&self.primary).await {
            ResolvedRoot {
                path: self.primary.clone(),
                is_fallback: false,
            }
        } else {
            tracing::warn!(
                "[StorageLocator] 主目录不可写，切换到回退目录: {:?} -> {:?}",
                self.primary,
                self.fallback
            );
            if !self.probe(&self.fallback).await {
                tracing::warn!("[StorageLocator] 回退目录同样不可写: {:?}", self.fallback);
            }
            ResolvedRoot {
                path: self.fallback.clone(),
                is_fallback: true,
            }
        };

        *self.active.write() = Some(resolved.clone());
        tracing::debug!(
            "[StorageLocator] 当前存储根目录: {:?} (fallback: {})",
            resolved.path,
            resolved.is_fallback
        );
        resolved
    }

    /// 获取当前存储根目录，尚未解析时先解析
    pub async fn active_root(&self) -> PathBuf {
        let cached = self.active.read().clone();
        if let Some(active) = cached {
            return active.path;
        }
        self.resolve_root().await.path
    }

    /// 已缓存的解析结果
    pub fn cached(&self) -> Option<ResolvedRoot> {
        self.active.read().clone()
    }

    /// 清除缓存，下次访问时重新解析
    pub fn invalidate(&self) {
        if self.active.write().take().is_some() {
            tracing::debug!("[StorageLocator] 清除存储根目录缓存");
        }
    }

    async fn probe(&self, root: &Path) -> bool {
        if let Err(e) = self.fs.mkdir(root).await {
            tracing::debug!("[StorageLocator] 创建目录失败 {:?}: {}", root, e);
            return false;
        }
        let marker = root.join(WRITE_TEST_FILE);
        if let Err(e) = self.fs.write(&marker, b"ok").await {
            tracing::debug!("[StorageLocator] 写入探测失败 {:?}: {}", marker, e);
            return false;
        }
        if let Err(e) = self.fs.delete(&marker).await {
            tracing::debug!("[StorageLocator] 删除探测文件失败 {:?}: {}", marker, e);
            return false;
        }
        true
    }
}

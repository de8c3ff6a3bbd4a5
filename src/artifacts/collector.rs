//! 过期产物清理
//!
//! `sweep` 只读取一次清单：清理期间新建的产物集不在本轮的快照里，
//! 最早在下一轮被处理。目录删除失败不影响记录移除，避免记录永远无法回收。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::composite::SPEC_FILE;
use super::lifecycle::ExpiryPolicy;
use super::manifest::{ManifestStore, MANIFEST_FILE};
use super::types::Manifest;
use crate::clock::{duration_ms, Clock};
use crate::session::{AssetFormat, IMAGES_DIR};
use crate::storage::{EntryKind, FileSystem, StorageLocator};

/// 选出已过期的记录 ID
pub fn plan_sweep(manifest: &Manifest, now_ms: i64) -> Vec<String> {
    manifest
        .files
        .values()
        .filter(|record| record.is_expired(now_ms))
        .map(|record| record.id.clone())
        .collect()
}

/// 过期产物清理器
pub struct GarbageCollector {
    fs: Arc<dyn FileSystem>,
    locator: Arc<StorageLocator>,
    manifest: Arc<ManifestStore>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
}

impl GarbageCollector {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        locator: Arc<StorageLocator>,
        manifest: Arc<ManifestStore>,
        clock: Arc<dyn Clock>,
        policy: ExpiryPolicy,
    ) -> Self {
        Self {
            fs,
            locator,
            manifest,
            clock,
            policy,
        }
    }

    /// 清理过期产物集，返回被移除的 ID
    pub async fn sweep(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let mut manifest = self.manifest.read().await;
        let expired = plan_sweep(&manifest, now);
        if expired.is_empty() {
            return expired;
        }

        for id in &expired {
            if let Some(record) = manifest.files.remove(id) {
                match record.set_dir() {
                    Some(dir) => {
                        if let Err(e) = self.fs.delete(dir).await {
                            tracing::warn!("[GarbageCollector] 删除产物目录失败 {:?}: {}", dir, e);
                        }
                    }
                    None => tracing::warn!(
                        "[GarbageCollector] 文档路径不在产物集目录内，只移除记录: {} ({:?})",
                        id,
                        record.spec_path
                    ),
                }
                tracing::info!(
                    "[GarbageCollector] 清理过期产物集: {} (状态: {})",
                    id,
                    record.status
                );
            }
        }

        manifest.last_cleanup = now;
        if let Err(e) = self.manifest.write(&manifest).await {
            tracing::warn!("[GarbageCollector] 清理后写入清单失败: {}", e);
        }
        expired
    }

    /// 按目录扫描回收清单中没有记录的目录
    ///
    /// 跳过清单中的产物集、`live_sessions` 中的会话目录、隐藏目录，
    /// 以及修改时间仍在保留窗口内的目录。目录结构不符合产物集或会话目录的
    /// 一律保留，因此存储根目录可以与其他数据共存。清单丢失后的恢复依赖这一步。
    pub async fn reconcile_orphans(&self, live_sessions: &HashSet<String>) -> Vec<PathBuf> {
        let root = self.locator.active_root().await;
        let now = self.clock.now_ms();
        let cutoff = now.saturating_sub(duration_ms(self.policy.orphan_window));
        let manifest = self.manifest.read().await;

        let entries = match self.fs.list_dir(&root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("[GarbageCollector] 读取存储目录失败 {:?}: {}", root, e);
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::Directory
                || entry.name.starts_with('.')
                || entry.name == MANIFEST_FILE
                || manifest.files.contains_key(&entry.name)
                || live_sessions.contains(&entry.name)
            {
                continue;
            }

            let modified_at = match self.fs.metadata(&entry.path).await {
                Ok(meta) => meta.modified_at,
                Err(_) => continue,
            };
            // 无法获取修改时间时不删除
            let Some(modified_at) = modified_at else {
                continue;
            };
            if modified_at > cutoff {
                continue;
            }
            if !self.has_artifact_layout(&entry.path).await {
                tracing::warn!(
                    "[GarbageCollector] 目录结构不是产物集或会话目录，跳过: {:?}",
                    entry.path
                );
                continue;
            }

            match self.fs.delete(&entry.path).await {
                Ok(()) => {
                    tracing::info!("[GarbageCollector] 清理孤立目录: {:?}", entry.path);
                    removed.push(entry.path);
                }
                Err(e) => {
                    tracing::warn!("[GarbageCollector] 删除孤立目录失败 {:?}: {}", entry.path, e);
                }
            }
        }
        removed
    }

    /// 目录内容只能是 `spec.md` 和 `images/`，`images/` 下只能是 `<id>.<format>` 文件
    async fn has_artifact_layout(&self, dir: &Path) -> bool {
        let Ok(children) = self.fs.list_dir(dir).await else {
            return false;
        };
        if children.is_empty() {
            return false;
        }

        for child in children {
            match (child.kind, child.name.as_str()) {
                (EntryKind::File, SPEC_FILE) => {}
                (EntryKind::Directory, IMAGES_DIR) => {
                    let Ok(images) = self.fs.list_dir(&child.path).await else {
                        return false;
                    };
                    if !images
                        .iter()
                        .all(|image| image.kind == EntryKind::File && is_asset_file_name(&image.name))
                    {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

fn is_asset_file_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && AssetFormat::from_extension(ext).is_some(),
        None => false,
    }
}

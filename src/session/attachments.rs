//! 会话附件服务
//!
//! 附件逐个落盘到 `<root>/<sessionId>/images/<assetId>.<format>`，
//! 并登记到调用方传入的 `SessionContext`。

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::asset::{decode_data_url, AssetFormat, AttachedAsset};
use super::context::SessionContext;
use crate::clock::Clock;
use crate::error::{ArtifactError, Result};
use crate::storage::{FileSystem, StorageLocator};

/// 会话图片子目录名
pub const IMAGES_DIR: &str = "images";

/// 会话附件服务
pub struct AttachmentService {
    fs: Arc<dyn FileSystem>,
    locator: Arc<StorageLocator>,
    clock: Arc<dyn Clock>,
    /// 单个附件最大字节数
    max_bytes: u64,
}

impl AttachmentService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        locator: Arc<StorageLocator>,
        clock: Arc<dyn Clock>,
        max_bytes: u64,
    ) -> Self {
        Self {
            fs,
            locator,
            clock,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// 会话图片目录
    pub async fn image_dir(&self, session_id: &str) -> PathBuf {
        self.locator
            .active_root()
            .await
            .join(session_id)
            .join(IMAGES_DIR)
    }

    /// 添加 data URL 编码的图片
    pub async fn attach_encoded(
        &self,
        ctx: &mut SessionContext,
        name: &str,
        data: &str,
    ) -> Result<AttachedAsset> {
        let decoded = decode_data_url(data)?;
        let format = decoded
            .format
            .unwrap_or_else(|| AssetFormat::from_file_name(name));
        self.attach_bytes(ctx, name, format, &decoded.bytes).await
    }

    /// 添加原始字节
    pub async fn attach_bytes(
        &self,
        ctx: &mut SessionContext,
        name: &str,
        format: AssetFormat,
        bytes: &[u8],
    ) -> Result<AttachedAsset> {
        let size = bytes.len() as u64;
        self.check_size(size)?;

        let asset = self.new_asset(ctx, name, format, size).await;
        let dir = asset.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let written = match self.fs.mkdir(&dir).await {
            Ok(()) => self.fs.write(&asset.path, bytes).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::error!("[Attachments] 写入图片失败 {:?}: {}", asset.path, e);
            self.locator.invalidate();
            return Err(e.into());
        }

        tracing::debug!(
            "[Attachments] 添加图片: {} ({} 字节) -> {:?}",
            asset.name,
            asset.size,
            asset.path
        );
        ctx.insert(asset.clone());
        Ok(asset)
    }

    /// 从已有文件添加图片
    pub async fn attach_file(&self, ctx: &mut SessionContext, source: &Path) -> Result<AttachedAsset> {
        let meta = self.fs.metadata(source).await?;
        self.check_size(meta.size)?;

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let format = AssetFormat::from_file_name(&name);
        let mut asset = self.new_asset(ctx, &name, format, meta.size).await;

        match self.fs.copy(source, &asset.path).await {
            Ok(copied) => asset.size = copied,
            Err(e) => {
                tracing::error!("[Attachments] 复制图片失败 {:?}: {}", source, e);
                self.locator.invalidate();
                return Err(e.into());
            }
        }

        tracing::debug!("[Attachments] 添加图片文件: {:?} -> {:?}", source, asset.path);
        ctx.insert(asset.clone());
        Ok(asset)
    }

    /// 移除附件，磁盘文件尽力删除
    pub async fn detach(&self, ctx: &mut SessionContext, asset_id: &str) -> Result<AttachedAsset> {
        let asset = ctx
            .remove(asset_id)
            .ok_or_else(|| ArtifactError::AssetNotFound {
                session_id: ctx.session_id().to_string(),
                asset_id: asset_id.to_string(),
            })?;
        if let Err(e) = self.fs.delete(&asset.path).await {
            tracing::warn!("[Attachments] 删除图片失败 {:?}: {}", asset.path, e);
        }
        Ok(asset)
    }

    /// 释放会话工作目录
    ///
    /// 附件可能位于旧的存储根目录下，因此同时删除每个附件所在的会话目录。
    pub async fn dispose(&self, ctx: &mut SessionContext) {
        let mut dirs: BTreeSet<PathBuf> = ctx
            .drain()
            .into_iter()
            .filter_map(|asset| asset.path.parent().and_then(Path::parent).map(Path::to_path_buf))
            .collect();
        dirs.insert(self.locator.active_root().await.join(ctx.session_id()));

        for dir in dirs {
            if let Err(e) = self.fs.delete(&dir).await {
                tracing::warn!("[Attachments] 删除会话目录失败 {:?}: {}", dir, e);
            }
        }
        tracing::debug!("[Attachments] 释放会话: {}", ctx.session_id());
    }

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            tracing::warn!(
                "[Attachments] 图片超过大小限制: {} > {}",
                size,
                self.max_bytes
            );
            return Err(ArtifactError::SizeLimit {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    async fn new_asset(
        &self,
        ctx: &SessionContext,
        name: &str,
        format: AssetFormat,
        size: u64,
    ) -> AttachedAsset {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self
            .image_dir(ctx.session_id())
            .await
            .join(format!("{}.{}", id, format.extension()));
        AttachedAsset {
            id,
            session_id: ctx.session_id().to_string(),
            name: name.to_string(),
            format,
            size,
            path,
            created_at: self.clock.now_ms(),
        }
    }
}

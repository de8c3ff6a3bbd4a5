//! 会话上下文
//!
//! 每个编辑会话持有一个 `SessionContext`，显式传给需要查找附件的操作。
//! 附件在打包前归会话所有；打包后产物集持有自己的副本。

use indexmap::IndexMap;

use super::asset::AttachedAsset;

/// 会话上下文
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
    assets: IndexMap<String, AttachedAsset>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            assets: IndexMap::new(),
        }
    }

    /// 使用随机 ID 创建会话
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 按添加顺序返回附件
    pub fn assets(&self) -> Vec<AttachedAsset> {
        self.assets.values().cloned().collect()
    }

    pub fn asset(&self, asset_id: &str) -> Option<&AttachedAsset> {
        self.assets.get(asset_id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// 附件总大小（字节）
    pub fn total_size(&self) -> u64 {
        self.assets.values().map(|a| a.size).sum()
    }

    pub(crate) fn insert(&mut self, asset: AttachedAsset) {
        self.assets.insert(asset.id.clone(), asset);
    }

    pub(crate) fn remove(&mut self, asset_id: &str) -> Option<AttachedAsset> {
        self.assets.shift_remove(asset_id)
    }

    pub(crate) fn drain(&mut self) -> Vec<AttachedAsset> {
        self.assets.drain(..).map(|(_, asset)| asset).collect()
    }
}

//! 草稿管理器

use std::sync::Arc;
use std::time::Duration;

use super::kv::KeyValueStore;
use super::types::Draft;
use crate::clock::{duration_ms, Clock};
use crate::error::Result;

/// 草稿键前缀
pub const DRAFT_KEY_PREFIX: &str = "draft:";

/// 草稿管理器
pub struct DraftManager {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// 草稿最长保留时间
    max_age: Duration,
}

impl DraftManager {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, max_age: Duration) -> Self {
        Self {
            store,
            clock,
            max_age,
        }
    }

    fn key_for(session_id: &str) -> String {
        format!("{}{}", DRAFT_KEY_PREFIX, session_id)
    }

    /// 保存草稿
    pub async fn save(&self, session_id: &str, content: &str) -> Result<Draft> {
        let draft = Draft {
            session_id: session_id.to_string(),
            content: content.to_string(),
            saved_at: self.clock.now_ms(),
        };
        let value = serde_json::to_string(&draft)?;
        self.store.set(&Self::key_for(session_id), value).await?;
        tracing::debug!(
            "[Drafts] 保存草稿: {} ({} 字符)",
            session_id,
            draft.content.chars().count()
        );
        Ok(draft)
    }

    /// 读取草稿，不存在或已损坏时返回 None
    pub async fn load(&self, session_id: &str) -> Option<Draft> {
        let value = self.store.get(&Self::key_for(session_id)).await?;
        match serde_json::from_str(&value) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::warn!("[Drafts] 草稿解析失败 {}: {}", session_id, e);
                None
            }
        }
    }

    /// 删除草稿
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        self.store.remove(&Self::key_for(session_id)).await?;
        Ok(())
    }

    /// 清理超过最长保留时间的草稿，返回被清理的会话 ID
    ///
    /// 无法解析的草稿同样被清理。
    pub async fn sweep_expired(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        let max_age = duration_ms(self.max_age);
        let mut removed = Vec::new();

        for key in self.store.keys().await {
            let Some(session_id) = key.strip_prefix(DRAFT_KEY_PREFIX) else {
                continue;
            };
            let expired = match self.store.get(&key).await {
                Some(value) => match serde_json::from_str::<Draft>(&value) {
                    Ok(draft) => draft.age_ms(now) > max_age,
                    Err(_) => true,
                },
                None => false,
            };
            if !expired {
                continue;
            }
            match self.store.remove(&key).await {
                Ok(()) => {
                    tracing::info!("[Drafts] 清理过期草稿: {}", session_id);
                    removed.push(session_id.to_string());
                }
                Err(e) => tracing::warn!("[Drafts] 删除草稿失败 {}: {}", session_id, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::drafts::MemoryKeyValueStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn create_manager() -> (DraftManager, Arc<MemoryKeyValueStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let manager = DraftManager::new(store.clone(), clock.clone(), 7 * DAY);
        (manager, store, clock)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (manager, _store, clock) = create_manager();
        clock.set(1234);
        let saved = manager.save("s1", "# Draft").await.unwrap();
        assert_eq!(saved.saved_at, 1234);
        assert_eq!(manager.load("s1").await, Some(saved));
        assert_eq!(manager.load("s2").await, None);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous() {
        let (manager, _store, clock) = create_manager();
        manager.save("s1", "one").await.unwrap();
        clock.advance(Duration::from_secs(5));
        manager.save("s1", "two").await.unwrap();

        let draft = manager.load("s1").await.unwrap();
        assert_eq!(draft.content, "two");
        assert_eq!(draft.saved_at, 5_000);
    }

    #[tokio::test]
    async fn test_clear() {
        let (manager, _store, _clock) = create_manager();
        manager.save("s1", "text").await.unwrap();
        manager.clear("s1").await.unwrap();
        assert!(manager.load("s1").await.is_none());
        manager.clear("s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_expired_by_age() {
        let (manager, store, clock) = create_manager();
        manager.save("old", "old").await.unwrap();
        clock.advance(3 * DAY);
        manager.save("recent", "recent").await.unwrap();
        store.set("unrelated", "keep".to_string()).await.unwrap();

        clock.advance(5 * DAY);
        let removed = manager.sweep_expired().await;

        assert_eq!(removed, vec!["old".to_string()]);
        assert!(manager.load("recent").await.is_some());
        assert_eq!(store.get("unrelated").await, Some("keep".to_string()));
    }

    #[tokio::test]
    async fn test_sweep_removes_corrupt_drafts() {
        let (manager, store, _clock) = create_manager();
        store
            .set("draft:broken", "not json".to_string())
            .await
            .unwrap();
        assert!(manager.load("broken").await.is_none());
        assert_eq!(manager.sweep_expired().await, vec!["broken".to_string()]);
    }
}

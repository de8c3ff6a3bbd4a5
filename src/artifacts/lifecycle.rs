//! 产物集生命周期
//!
//! 状态机：`active --submit--> submitted --complete--> completed`。
//! 过期不存储，由清理器根据 `expires_at` 推导。
//!
//! ## 目录结构
//! ```text
//! <root>/
//! ├── manifest.json
//! └── {artifact-set-id}/
//!     ├── spec.md          # 合成文档
//!     └── images/
//!         └── {asset-id}.{format}
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use super::composite::{render_composite, BundledAsset, SPEC_FILE};
use super::manifest::ManifestStore;
use super::types::{ArtifactSetRecord, ArtifactStatus};
use crate::clock::{duration_ms, Clock};
use crate::config::RetentionConfig;
use crate::error::Result;
use crate::session::{AttachedAsset, IMAGES_DIR};
use crate::storage::{FileSystem, StorageLocator};

/// 按状态计算过期时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// 未完成产物的保留时间
    pub orphan_window: Duration,
    /// 完成后的宽限时间
    pub completed_window: Duration,
}

impl ExpiryPolicy {
    pub fn new(orphan_window: Duration, completed_window: Duration) -> Self {
        Self {
            orphan_window,
            completed_window,
        }
    }

    pub fn from_config(config: &RetentionConfig) -> Self {
        Self::new(config.orphan_window(), config.completed_window())
    }

    pub fn window_for(&self, status: ArtifactStatus) -> Duration {
        match status {
            ArtifactStatus::Active | ArtifactStatus::Submitted => self.orphan_window,
            ArtifactStatus::Completed => self.completed_window,
        }
    }

    pub fn expiry_for(&self, status: ArtifactStatus, now_ms: i64) -> i64 {
        now_ms.saturating_add(duration_ms(self.window_for(status)))
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from_config(&RetentionConfig::default())
    }
}

/// 产物集生命周期管理
pub struct ArtifactLifecycle {
    fs: Arc<dyn FileSystem>,
    locator: Arc<StorageLocator>,
    manifest: Arc<ManifestStore>,
    clock: Arc<dyn Clock>,
    policy: ExpiryPolicy,
}

impl ArtifactLifecycle {
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

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// 创建产物集
    ///
    /// 单个附件复制失败只记录日志并跳过；目录、合成文档或清单写入失败时
    /// 删除已创建的目录并返回错误。
    pub async fn create_set(
        &self,
        session_id: &str,
        composite_text: &str,
        assets: &[AttachedAsset],
    ) -> Result<ArtifactSetRecord> {
        let root = self.locator.active_root().await;
        let id = uuid::Uuid::new_v4().to_string();
        let set_dir = root.join(&id);
        let images_dir = set_dir.join(IMAGES_DIR);

        if let Err(e) = self.fs.mkdir(&images_dir).await {
            tracing::error!("[ArtifactLifecycle] 创建产物目录失败 {:?}: {}", set_dir, e);
            self.abandon(&set_dir).await;
            return Err(e.into());
        }

        let mut image_paths = IndexMap::new();
        let mut bundled = Vec::new();
        for asset in assets {
            let target = images_dir.join(asset.file_name());
            match self.fs.copy(&asset.path, &target).await {
                Ok(_) => {
                    image_paths.insert(asset.id.clone(), target.clone());
                    bundled.push(BundledAsset {
                        id: asset.id.clone(),
                        name: asset.name.clone(),
                        path: target,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "[ArtifactLifecycle] 复制图片失败，跳过 {} ({:?}): {}",
                        asset.name,
                        asset.path,
                        e
                    );
                }
            }
        }

        let spec_path = set_dir.join(SPEC_FILE);
        let document = render_composite(composite_text, &bundled);
        if let Err(e) = self.fs.write(&spec_path, document.as_bytes()).await {
            tracing::error!("[ArtifactLifecycle] 写入合成文档失败 {:?}: {}", spec_path, e);
            self.abandon(&set_dir).await;
            return Err(e.into());
        }

        let now = self.clock.now_ms();
        let record = ArtifactSetRecord {
            id: id.clone(),
            session_id: session_id.to_string(),
            spec_path,
            image_paths,
            created_at: now,
            expires_at: self.policy.expiry_for(ArtifactStatus::Active, now),
            status: ArtifactStatus::Active,
        };

        let mut manifest = self.manifest.read().await;
        manifest.files.insert(id.clone(), record.clone());
        if let Err(e) = self.manifest.write(&manifest).await {
            self.abandon(&set_dir).await;
            return Err(e);
        }

        tracing::info!(
            "[ArtifactLifecycle] 创建产物集: {} (会话: {}, 图片: {}/{})",
            id,
            session_id,
            record.image_paths.len(),
            assets.len()
        );
        Ok(record)
    }

    /// 标记为已提交
    ///
    /// 只有 `active` 会发生转换；未知 ID 或其他状态不写清单，返回 None。
    pub async fn mark_submitted(&self, id: &str) -> Result<Option<ArtifactSetRecord>> {
        self.transition(id, ArtifactStatus::Submitted, |status| {
            status == ArtifactStatus::Active
        })
        .await
    }

    /// 标记为已完成，并重新计算过期时间
    ///
    /// `active` 和 `submitted` 都可以完成；未知 ID 或已完成时不写清单。
    pub async fn mark_completed(&self, id: &str) -> Result<Option<ArtifactSetRecord>> {
        self.transition(id, ArtifactStatus::Completed, |status| {
            status != ArtifactStatus::Completed
        })
        .await
    }

    /// 立即删除产物集（目录尽力删除，记录一定移除）
    pub async fn discard(&self, id: &str) -> Result<bool> {
        let mut manifest = self.manifest.read().await;
        let Some(record) = manifest.files.remove(id) else {
            return Ok(false);
        };
        match record.set_dir() {
            Some(dir) => {
                if let Err(e) = self.fs.delete(dir).await {
                    tracing::warn!("[ArtifactLifecycle] 删除产物目录失败 {:?}: {}", dir, e);
                }
            }
            None => tracing::warn!(
                "[ArtifactLifecycle] 文档路径不在产物集目录内，跳过删除: {} ({:?})",
                id,
                record.spec_path
            ),
        }
        self.manifest.write(&manifest).await?;
        tracing::info!("[ArtifactLifecycle] 丢弃产物集: {}", id);
        Ok(true)
    }

    pub async fn get(&self, id: &str) -> Option<ArtifactSetRecord> {
        self.manifest.read().await.files.remove(id)
    }

    /// 列出所有产物集，按创建时间倒序
    pub async fn list(&self) -> Vec<ArtifactSetRecord> {
        let mut records: Vec<ArtifactSetRecord> =
            self.manifest.read().await.files.into_values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    async fn transition(
        &self,
        id: &str,
        to: ArtifactStatus,
        allowed: impl Fn(ArtifactStatus) -> bool,
    ) -> Result<Option<ArtifactSetRecord>> {
        let mut manifest = self.manifest.read().await;
        let Some(record) = manifest.files.get_mut(id) else {
            tracing::debug!("[ArtifactLifecycle] 产物集不存在，忽略状态转换: {} -> {}", id, to);
            return Ok(None);
        };
        if !allowed(record.status) {
            tracing::debug!(
                "[ArtifactLifecycle] 忽略状态转换: {} ({} -> {})",
                id,
                record.status,
                to
            );
            return Ok(None);
        }

        let from = record.status;
        record.status = to;
        if to == ArtifactStatus::Completed {
            record.expires_at = self.policy.expiry_for(to, self.clock.now_ms());
        }
        let updated = record.clone();
        self.manifest.write(&manifest).await?;

        tracing::info!("[ArtifactLifecycle] 状态转换: {} ({} -> {})", id, from, to);
        Ok(Some(updated))
    }

    async fn abandon(&self, set_dir: &Path) {
        self.locator.invalidate();
        if let Err(e) = self.fs.delete(set_dir).await {
            tracing::warn!("[ArtifactLifecycle] 清理未完成的产物目录失败 {:?}: {}", set_dir, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::composite::ATTACHMENTS_HEADING;
    use crate::clock::ManualClock;
    use crate::session::AssetFormat;
    use crate::storage::LocalFileSystem;
    use crate::test_support::FlakyFileSystem;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    struct Fixture {
        lifecycle: ArtifactLifecycle,
        manifest: Arc<ManifestStore>,
        clock: Arc<ManualClock>,
        temp: TempDir,
    }

    impl Fixture {
        fn root(&self) -> PathBuf {
            self.temp.path().join("root")
        }

        fn fallback(&self) -> PathBuf {
            self.temp.path().join("fallback")
        }
    }

    fn fixture_with(make_fs: impl FnOnce(&Path) -> Arc<dyn FileSystem>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let fs = make_fs(temp.path());
        let locator = Arc::new(StorageLocator::new(
            fs.clone(),
            temp.path().join("root"),
            temp.path().join("fallback"),
        ));
        let manifest = Arc::new(ManifestStore::new(fs.clone(), locator.clone()));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let lifecycle = ArtifactLifecycle::new(
            fs,
            locator,
            manifest.clone(),
            clock.clone(),
            ExpiryPolicy::new(24 * HOUR, HOUR),
        );
        Fixture {
            lifecycle,
            manifest,
            clock,
            temp,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| Arc::new(LocalFileSystem::new()))
    }

    fn source_asset(dir: &Path, id: &str, contents: &[u8]) -> AttachedAsset {
        let path = dir.join(format!("{id}.png"));
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(&path, contents).unwrap();
        AttachedAsset {
            id: id.to_string(),
            session_id: "session".to_string(),
            name: format!("{id}-name.png"),
            format: AssetFormat::Png,
            size: contents.len() as u64,
            path,
            created_at: 0,
        }
    }

    #[test]
    fn test_expiry_policy_windows() {
        let policy = ExpiryPolicy::new(Duration::from_secs(10), Duration::from_secs(2));
        assert_eq!(policy.expiry_for(ArtifactStatus::Active, 0), 10_000);
        assert_eq!(policy.expiry_for(ArtifactStatus::Submitted, 0), 10_000);
        assert_eq!(policy.expiry_for(ArtifactStatus::Completed, 5), 2_005);
    }

    #[tokio::test]
    async fn test_create_set_layout() {
        let fx = fixture();
        let sources = fx.temp.path().join("sources");
        let a = source_asset(&sources, "a", b"aaa");
        let b = source_asset(&sources, "b", b"bbbb");

        let record = fx
            .lifecycle
            .create_set("session", "# Spec\n\nbody", &[a.clone(), b.clone()])
            .await
            .unwrap();

        assert_eq!(record.status, ArtifactStatus::Active);
        assert_eq!(record.session_id, "session");
        assert_ne!(record.id, "session");
        assert_eq!(record.created_at, 1_000_000);
        assert_eq!(record.expires_at, 1_000_000 + 24 * 3_600_000);

        let set_dir = fx.root().join(&record.id);
        assert_eq!(record.spec_path, set_dir.join("spec.md"));
        assert_eq!(
            record.image_paths.keys().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            std::fs::read(set_dir.join("images").join("b.png")).unwrap(),
            b"bbbb"
        );

        // 目录中只有合成文档和 images/
        let mut top: Vec<String> = std::fs::read_dir(&set_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        top.sort();
        assert_eq!(top, vec!["images".to_string(), "spec.md".to_string()]);
        assert_eq!(std::fs::read_dir(set_dir.join("images")).unwrap().count(), 2);

        let doc = std::fs::read_to_string(&record.spec_path).unwrap();
        assert!(doc.starts_with("# Spec\n\nbody"));
        assert!(doc.contains(ATTACHMENTS_HEADING));
        assert!(doc.contains("![a-name.png]"));
        assert!(doc.contains("![b-name.png]"));

        let manifest = fx.manifest.read().await;
        assert_eq!(manifest.files.get(&record.id), Some(&record));
    }

    #[tokio::test]
    async fn test_create_set_skips_missing_asset() {
        let fx = fixture();
        let sources = fx.temp.path().join("sources");
        let a = source_asset(&sources, "a", b"a");
        let b = source_asset(&sources, "b", b"b");
        let c = source_asset(&sources, "c", b"c");
        std::fs::remove_file(&b.path).unwrap();

        let record = fx
            .lifecycle
            .create_set("session", "text", &[a, b, c])
            .await
            .unwrap();

        assert_eq!(record.image_paths.len(), 2);
        assert!(!record.image_paths.contains_key("b"));
        let doc = std::fs::read_to_string(&record.spec_path).unwrap();
        assert_eq!(doc.matches("![").count(), 2);
        assert!(!doc.contains("b-name.png"));
    }

    #[tokio::test]
    async fn test_create_set_skips_failed_copy() {
        let temp_sources = TempDir::new().unwrap();
        let a = source_asset(temp_sources.path(), "a", b"a");
        let b = source_asset(temp_sources.path(), "b", b"b");
        let failing = b.path.clone();
        let fx = fixture_with(move |_| Arc::new(FlakyFileSystem::new().fail_copy_from(&failing)));

        let record = fx
            .lifecycle
            .create_set("session", "text", &[a, b])
            .await
            .unwrap();
        assert_eq!(record.image_paths.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_create_set_without_assets() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "only text", &[]).await.unwrap();
        assert!(record.image_paths.is_empty());
        assert_eq!(
            std::fs::read_to_string(&record.spec_path).unwrap(),
            "only text\n"
        );
    }

    #[tokio::test]
    async fn test_create_set_under_fallback_root() {
        let fx = fixture_with(|base| {
            Arc::new(FlakyFileSystem::new().deny_writes_under(&base.join("root")))
        });
        let sources = fx.temp.path().join("sources");
        let a = source_asset(&sources, "a", b"a");

        let record = fx.lifecycle.create_set("s", "text", &[a]).await.unwrap();

        let fallback = fx.fallback();
        assert!(record.spec_path.starts_with(&fallback));
        assert!(record.image_paths.values().all(|p| p.starts_with(&fallback)));
        assert!(fallback.join("manifest.json").exists());
        assert!(!fx.root().exists());
    }

    #[tokio::test]
    async fn test_create_set_failure_leaves_no_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        let fx_fs = Arc::new(FlakyFileSystem::new().deny_writes_under(&root.join("manifest.json")));
        let locator = Arc::new(StorageLocator::new(
            fx_fs.clone(),
            root.clone(),
            temp.path().join("fallback"),
        ));
        let manifest = Arc::new(ManifestStore::new(fx_fs.clone(), locator.clone()));
        let lifecycle = ArtifactLifecycle::new(
            fx_fs,
            locator,
            manifest,
            Arc::new(ManualClock::new(0)),
            ExpiryPolicy::default(),
        );

        assert!(lifecycle.create_set("s", "text", &[]).await.is_err());
        let leftovers: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "leaked: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_transitions() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "text", &[]).await.unwrap();

        let submitted = fx.lifecycle.mark_submitted(&record.id).await.unwrap().unwrap();
        assert_eq!(submitted.status, ArtifactStatus::Submitted);
        assert_eq!(submitted.expires_at, record.expires_at);

        fx.clock.advance(HOUR);
        let completed = fx.lifecycle.mark_completed(&record.id).await.unwrap().unwrap();
        assert_eq!(completed.status, ArtifactStatus::Completed);
        assert_eq!(completed.expires_at, fx.clock.now_ms() + 3_600_000);

        // completed 之后不能回到 submitted
        assert!(fx.lifecycle.mark_submitted(&record.id).await.unwrap().is_none());
        assert_eq!(
            fx.lifecycle.get(&record.id).await.unwrap().status,
            ArtifactStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_complete_directly_from_active() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "text", &[]).await.unwrap();
        let completed = fx.lifecycle.mark_completed(&record.id).await.unwrap().unwrap();
        assert_eq!(completed.status, ArtifactStatus::Completed);
    }

    #[tokio::test]
    async fn test_idempotent_transitions_leave_manifest_untouched() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "text", &[]).await.unwrap();
        fx.lifecycle.mark_completed(&record.id).await.unwrap();
        let path = fx.manifest.path().await;
        let before = std::fs::read(&path).unwrap();

        fx.clock.advance(HOUR);
        assert!(fx.lifecycle.mark_completed(&record.id).await.unwrap().is_none());
        assert!(fx.lifecycle.mark_submitted(&record.id).await.unwrap().is_none());
        assert!(fx.lifecycle.mark_submitted("unknown").await.unwrap().is_none());
        assert!(fx.lifecycle.mark_completed("unknown").await.unwrap().is_none());

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_discard_removes_directory_and_record() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "text", &[]).await.unwrap();

        assert!(fx.lifecycle.discard(&record.id).await.unwrap());
        assert!(!record.set_dir().unwrap().exists());
        assert!(fx.lifecycle.get(&record.id).await.is_none());
        assert!(!fx.lifecycle.discard(&record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_discard_keeps_directory_not_named_after_set() {
        let fx = fixture();
        let record = fx.lifecycle.create_set("s", "text", &[]).await.unwrap();
        let outside = fx.temp.path().join("home");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("spec.md"), "mine").unwrap();

        let mut manifest = fx.manifest.read().await;
        manifest.files.get_mut(&record.id).unwrap().spec_path = outside.join("spec.md");
        fx.manifest.write(&manifest).await.unwrap();

        assert!(fx.lifecycle.discard(&record.id).await.unwrap());
        assert!(outside.join("spec.md").exists());
        assert!(fx.lifecycle.get(&record.id).await.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let fx = fixture();
        let first = fx.lifecycle.create_set("s", "one", &[]).await.unwrap();
        fx.clock.advance(Duration::from_secs(1));
        let second = fx.lifecycle.create_set("s", "two", &[]).await.unwrap();

        let ids: Vec<String> = fx.lifecycle.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}

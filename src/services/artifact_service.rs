//! 临时产物服务
//!
//! 组装存储定位、清单、生命周期、清理器、附件和草稿，对外提供会话级操作。
//! 所有会修改清单的调用都经过同一把互斥锁，保证进程内同一时刻只有一个
//! 读-改-写在进行。

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::artifacts::{
    ArtifactLifecycle, ArtifactSetRecord, ExpiryPolicy, GarbageCollector, ManifestStore,
};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::drafts::{DraftManager, FileKeyValueStore, KeyValueStore};
use crate::error::Result;
use crate::models::{SessionEvent, SessionMessage};
use crate::session::{AttachedAsset, AttachmentService, SessionContext};
use crate::storage::{FileSystem, LocalFileSystem, ResolvedRoot, StorageLocator};

/// 草稿文件名（位于存储根目录）
pub const DRAFTS_FILE: &str = "drafts.json";

/// 启动清理结果
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// 存储根目录
    pub root: Option<ResolvedRoot>,
    /// 被清理的产物集 ID
    pub removed_sets: Vec<String>,
    /// 被清理的孤立目录
    pub removed_dirs: Vec<PathBuf>,
    /// 被清理的草稿所属会话
    pub removed_drafts: Vec<String>,
}

/// 临时产物服务
pub struct ArtifactService {
    config: Config,
    locator: Arc<StorageLocator>,
    lifecycle: ArtifactLifecycle,
    collector: GarbageCollector,
    attachments: AttachmentService,
    drafts: DraftManager,
    /// 清单写入锁
    manifest_gate: Mutex<()>,
}

impl ArtifactService {
    /// 使用本地文件系统和系统时钟创建服务
    pub async fn open(config: Config) -> Self {
        Self::with_parts(config, Arc::new(LocalFileSystem::new()), Arc::new(SystemClock)).await
    }

    /// 使用指定的文件系统和时钟创建服务
    pub async fn with_parts(config: Config, fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Self {
        let locator = Arc::new(StorageLocator::from_config(fs.clone(), &config.storage));
        locator.resolve_root().await;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::under_root(
            fs.clone(),
            locator.clone(),
            DRAFTS_FILE,
        ));
        Self::assemble(config, fs, clock, locator, store)
    }

    /// 使用已构造的定位器和草稿存储组装服务
    pub fn assemble(
        config: Config,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        locator: Arc<StorageLocator>,
        draft_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let policy = ExpiryPolicy::from_config(&config.retention);
        let manifest = Arc::new(ManifestStore::new(fs.clone(), locator.clone()));
        let lifecycle = ArtifactLifecycle::new(
            fs.clone(),
            locator.clone(),
            manifest.clone(),
            clock.clone(),
            policy,
        );
        let collector = GarbageCollector::new(
            fs.clone(),
            locator.clone(),
            manifest,
            clock.clone(),
            policy,
        );
        let attachments = AttachmentService::new(
            fs,
            locator.clone(),
            clock.clone(),
            config.limits.max_image_bytes,
        );
        let drafts = DraftManager::new(draft_store, clock, config.retention.draft_max_age());

        Self {
            config,
            locator,
            lifecycle,
            collector,
            attachments,
            drafts,
            manifest_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn locator(&self) -> &StorageLocator {
        &self.locator
    }

    pub fn lifecycle(&self) -> &ArtifactLifecycle {
        &self.lifecycle
    }

    pub fn attachments(&self) -> &AttachmentService {
        &self.attachments
    }

    pub fn drafts(&self) -> &DraftManager {
        &self.drafts
    }

    /// 启动时清理：过期产物集、孤立目录、过期草稿
    pub async fn startup(&self, live_sessions: &HashSet<String>) -> StartupReport {
        let removed_sets = self.sweep().await;
        let removed_dirs = self.reconcile_orphans(live_sessions).await;
        let removed_drafts = self.drafts.sweep_expired().await;

        tracing::info!(
            "[ArtifactService] 启动清理完成: 产物集 {}, 孤立目录 {}, 草稿 {}",
            removed_sets.len(),
            removed_dirs.len(),
            removed_drafts.len()
        );
        StartupReport {
            root: self.locator.cached(),
            removed_sets,
            removed_dirs,
            removed_drafts,
        }
    }

    /// 添加 data URL 图片
    pub async fn attach_image(
        &self,
        ctx: &mut SessionContext,
        name: &str,
        data: &str,
    ) -> Result<AttachedAsset> {
        self.attachments.attach_encoded(ctx, name, data).await
    }

    /// 移除图片
    pub async fn remove_image(&self, ctx: &mut SessionContext, asset_id: &str) -> Result<AttachedAsset> {
        self.attachments.detach(ctx, asset_id).await
    }

    /// 提交：打包会话附件生成产物集并标记为已提交，随后清除草稿
    pub async fn submit(&self, ctx: &SessionContext, content: &str) -> Result<ArtifactSetRecord> {
        let record = {
            let _gate = self.manifest_gate.lock().await;
            let created = self
                .lifecycle
                .create_set(ctx.session_id(), content, &ctx.assets())
                .await?;
            self.lifecycle
                .mark_submitted(&created.id)
                .await?
                .unwrap_or(created)
        };

        if let Err(e) = self.drafts.clear(ctx.session_id()).await {
            tracing::warn!("[ArtifactService] 清除草稿失败 {}: {}", ctx.session_id(), e);
        }
        Ok(record)
    }

    /// 外部执行完成
    pub async fn complete(&self, set_id: &str) -> Result<Option<ArtifactSetRecord>> {
        let _gate = self.manifest_gate.lock().await;
        self.lifecycle.mark_completed(set_id).await
    }

    /// 立即丢弃产物集
    pub async fn discard(&self, set_id: &str) -> Result<bool> {
        let _gate = self.manifest_gate.lock().await;
        self.lifecycle.discard(set_id).await
    }

    /// 清理过期产物集
    pub async fn sweep(&self) -> Vec<String> {
        let _gate = self.manifest_gate.lock().await;
        self.collector.sweep().await
    }

    /// 回收清单之外的孤立目录
    pub async fn reconcile_orphans(&self, live_sessions: &HashSet<String>) -> Vec<PathBuf> {
        let _gate = self.manifest_gate.lock().await;
        self.collector.reconcile_orphans(live_sessions).await
    }

    /// 取消会话：释放工作目录并清除草稿
    pub async fn cancel_session(&self, ctx: &mut SessionContext) {
        self.attachments.dispose(ctx).await;
        if let Err(e) = self.drafts.clear(ctx.session_id()).await {
            tracing::warn!("[ArtifactService] 清除草稿失败 {}: {}", ctx.session_id(), e);
        }
    }

    /// 处理编辑界面消息
    pub async fn handle_message(&self, ctx: &mut SessionContext, message: SessionMessage) -> SessionEvent {
        let result = match message {
            SessionMessage::AttachImage { name, data } => self
                .attach_image(ctx, &name, &data)
                .await
                .map(|asset| SessionEvent::ImageAttached { asset }),
            SessionMessage::RemoveImage { id } => self
                .remove_image(ctx, &id)
                .await
                .map(|asset| SessionEvent::ImageRemoved { id: asset.id }),
            SessionMessage::SaveDraft { content } => self
                .drafts
                .save(ctx.session_id(), &content)
                .await
                .map(|draft| SessionEvent::DraftSaved {
                    saved_at: draft.saved_at,
                }),
            SessionMessage::LoadDraft => Ok(SessionEvent::DraftLoaded {
                draft: self.drafts.load(ctx.session_id()).await,
            }),
            SessionMessage::Submit { content } => {
                self.submit(ctx, &content)
                    .await
                    .map(|record| SessionEvent::Submitted {
                        attached: record.image_paths.len(),
                        set_id: record.id,
                        spec_path: record.spec_path,
                    })
            }
            SessionMessage::Complete { set_id } => self
                .complete(&set_id)
                .await
                .map(|_| SessionEvent::Completed { set_id }),
            SessionMessage::Cancel => {
                self.cancel_session(ctx).await;
                Ok(SessionEvent::Cancelled)
            }
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("[ArtifactService] 处理消息失败 {}: {}", ctx.session_id(), e);
            SessionEvent::error(e.to_string())
        })
    }

    /// 启动周期清理任务
    ///
    /// 服务被释放后任务自动退出。第一次清理在一个间隔之后执行。
    pub fn spawn_periodic_sweep(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let service: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                let removed = service.sweep().await;
                if !removed.is_empty() {
                    tracing::debug!("[ArtifactService] 周期清理: {} 个产物集", removed.len());
                }
            }
        })
    }

    /// 按配置启动周期清理，未配置时返回 None
    pub fn spawn_configured_sweep(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config
            .retention
            .sweep_interval()
            .map(|interval| self.spawn_periodic_sweep(interval))
    }
}

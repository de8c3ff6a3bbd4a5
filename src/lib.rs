//! specdraft
//!
//! 规格草稿编辑会话的临时产物管理：
//! - 会话附件落盘与校验
//! - 提交时生成独立的产物集目录并登记到清单
//! - 按状态保留时间过期清理，启动时回收孤立目录
//! - 草稿保存与过期清理

pub mod artifacts;
pub mod clock;
pub mod config;
pub mod drafts;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use artifacts::{ArtifactLifecycle, ArtifactSetRecord, ArtifactStatus, GarbageCollector, ManifestStore};
pub use config::Config;
pub use error::{ArtifactError, Result};
pub use models::{SessionEvent, SessionMessage};
pub use services::{ArtifactService, StartupReport};
pub use session::{AttachedAsset, SessionContext};
pub use storage::{FileSystem, LocalFileSystem, StorageLocator};

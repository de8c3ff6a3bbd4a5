//! 临时产物管理模块
//!
//! 每次提交生成一个独立的产物集目录，由 `manifest.json` 统一登记，
//! 按状态对应的保留时间过期后被清理。
//!
//! ## 目录结构
//! ```text
//! <root>/
//! ├── manifest.json           # 产物清单
//! ├── {artifact-set-id}/
//! │   ├── spec.md             # 合成文档
//! │   └── images/             # 打包的附件副本
//! └── {session-id}/
//!     └── images/             # 会话中尚未打包的附件
//! ```

mod collector;
mod composite;
mod lifecycle;
mod manifest;
mod types;

pub use collector::{plan_sweep, GarbageCollector};
pub use composite::{render_composite, BundledAsset, ATTACHMENTS_HEADING, SPEC_FILE};
pub use lifecycle::{ArtifactLifecycle, ExpiryPolicy};
pub use manifest::{ManifestStore, MANIFEST_FILE};
pub use types::{ArtifactSetRecord, ArtifactStatus, DerivedState, Manifest, MANIFEST_VERSION};

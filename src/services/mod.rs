//! 服务层
//!
//! 组合存储、产物、附件和草稿模块，向编辑界面提供会话级操作。

mod artifact_service;

pub use artifact_service::{ArtifactService, StartupReport, DRAFTS_FILE};

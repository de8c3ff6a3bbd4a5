//! 临时产物类型定义

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// 清单格式版本
pub const MANIFEST_VERSION: &str = "1.0";

/// 产物集状态
///
/// 过期（孤立）不是存储的状态，而是在清理时根据 `expires_at` 推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// 已创建，尚未提交
    Active,
    /// 已提交给外部进程
    Submitted,
    /// 外部进程已完成
    Completed,
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Submitted => write!(f, "submitted"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// 清理时推导出的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedState {
    Live(ArtifactStatus),
    Expired,
}

/// 产物集记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSetRecord {
    /// 产物集 ID（与会话 ID 无关）
    pub id: String,
    /// 所属会话 ID
    pub session_id: String,
    /// 合成文档路径
    pub spec_path: PathBuf,
    /// 附件 ID -> 打包后的绝对路径
    #[serde(default)]
    pub image_paths: IndexMap<String, PathBuf>,
    /// 创建时间（Unix 时间戳，毫秒）
    pub created_at: i64,
    /// 过期时间（Unix 时间戳，毫秒）
    pub expires_at: i64,
    pub status: ArtifactStatus,
}

impl ArtifactSetRecord {
    /// 产物集目录（合成文档所在目录）
    ///
    /// 目录名必须与记录 ID 一致，否则返回 None，调用方不得删除。
    pub fn set_dir(&self) -> Option<&Path> {
        self.spec_path
            .parent()
            .filter(|dir| dir.file_name() == Some(OsStr::new(&self.id)))
    }

    /// 是否已过期
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    pub fn derived_state(&self, now_ms: i64) -> DerivedState {
        if self.is_expired(now_ms) {
            DerivedState::Expired
        } else {
            DerivedState::Live(self.status)
        }
    }

    /// 存活时长（毫秒）
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.created_at)
    }
}

/// 产物清单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    #[serde(default)]
    pub files: BTreeMap<String, ArtifactSetRecord>,
    /// 上次成功清理时间（Unix 时间戳，毫秒）
    #[serde(default)]
    pub last_cleanup: i64,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            files: BTreeMap::new(),
            last_cleanup: 0,
        }
    }
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

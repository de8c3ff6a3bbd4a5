//! 配置类型定义

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 默认单个图片大小上限：10 MiB
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
/// 默认未完成产物保留时间：24 小时
pub const DEFAULT_ORPHAN_WINDOW_SECS: u64 = 24 * 60 * 60;
/// 默认已完成产物保留时间：1 小时
pub const DEFAULT_COMPLETED_WINDOW_SECS: u64 = 60 * 60;
/// 默认草稿最长保留时间：7 天
pub const DEFAULT_DRAFT_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
/// 默认回退子路径（位于系统临时目录下）
pub const DEFAULT_FALLBACK_SUBPATH: &str = "specdraft-artifacts";

/// 主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub limits: LimitsConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// 存储位置配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 主存储目录，支持 `~`；未设置时使用 `~/.specdraft/artifacts`
    pub primary_root: Option<String>,
    /// 回退目录相对系统临时目录的子路径
    pub fallback_subpath: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary_root: None,
            fallback_subpath: DEFAULT_FALLBACK_SUBPATH.to_string(),
        }
    }
}

/// 大小限制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 单个图片最大字节数
    pub max_image_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// 过期策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// 未提交或已提交但未完成的产物保留秒数
    pub orphan_window_secs: u64,
    /// 完成后的宽限秒数
    pub completed_window_secs: u64,
    /// 草稿最长保留秒数
    pub draft_max_age_secs: u64,
    /// 周期清理间隔（秒），None 表示只在启动时清理
    pub sweep_interval_secs: Option<u64>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            orphan_window_secs: DEFAULT_ORPHAN_WINDOW_SECS,
            completed_window_secs: DEFAULT_COMPLETED_WINDOW_SECS,
            draft_max_age_secs: DEFAULT_DRAFT_MAX_AGE_SECS,
            sweep_interval_secs: None,
        }
    }
}

impl RetentionConfig {
    pub fn orphan_window(&self) -> Duration {
        Duration::from_secs(self.orphan_window_secs)
    }

    pub fn completed_window(&self) -> Duration {
        Duration::from_secs(self.completed_window_secs)
    }

    pub fn draft_max_age(&self) -> Duration {
        Duration::from_secs(self.draft_max_age_secs)
    }

    /// 周期清理间隔，0 视为未启用
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（trace, debug, info, warn, error）
    pub level: String,
    /// 是否输出 target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

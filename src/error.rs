//! 错误类型定义

use std::io;

/// 临时产物管理错误
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// 附件超过单文件大小限制
    #[error("图片大小 {size} 字节超过限制 {limit} 字节")]
    SizeLimit { size: u64, limit: u64 },

    /// 附件编码格式无效（不是 data:image/<format>;base64,<payload>）
    #[error("无效的图片编码: {0}")]
    InvalidEncoding(String),

    /// 会话中不存在指定附件
    #[error("会话 {session_id} 中不存在附件 {asset_id}")]
    AssetNotFound { session_id: String, asset_id: String },

    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    #[error("序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ArtifactError {
    /// 是否为校验错误（调用方输入问题，而非存储故障）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SizeLimit { .. } | Self::InvalidEncoding(_) | Self::AssetNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

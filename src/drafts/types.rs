//! 草稿类型定义

use serde::{Deserialize, Serialize};

/// 会话草稿
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// 所属会话 ID
    pub session_id: String,
    /// 正文内容
    pub content: String,
    /// 最后保存时间（Unix 时间戳，毫秒）
    pub saved_at: i64,
}

impl Draft {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.saved_at)
    }
}

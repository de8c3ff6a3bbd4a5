//! 编辑界面与核心之间的消息协议
//!
//! 入站消息与出站事件均以 `type` 字段区分，例如：
//! `{"type": "attachImage", "name": "shot.png", "data": "data:image/png;base64,..."}`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drafts::Draft;
use crate::session::AttachedAsset;

/// 编辑界面发来的消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionMessage {
    /// 添加图片（data URL）
    AttachImage { name: String, data: String },
    /// 移除图片
    RemoveImage { id: String },
    /// 保存草稿
    SaveDraft { content: String },
    /// 读取草稿
    LoadDraft,
    /// 提交：生成产物集
    Submit { content: String },
    /// 外部执行完成
    #[serde(rename_all = "camelCase")]
    Complete { set_id: String },
    /// 取消会话，释放工作目录和草稿
    Cancel,
}

/// 返回给编辑界面的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    ImageAttached {
        asset: AttachedAsset,
    },
    ImageRemoved {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    DraftSaved {
        saved_at: i64,
    },
    DraftLoaded {
        draft: Option<Draft>,
    },
    #[serde(rename_all = "camelCase")]
    Submitted {
        set_id: String,
        spec_path: PathBuf,
        /// 成功打包的图片数
        attached: usize,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        set_id: String,
    },
    Cancelled,
    Error {
        message: String,
    },
}

impl SessionEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

//! 草稿模块
//!
//! 以会话为键保存编辑中的正文快照，按固定最长保留时间清理。
//! 存储介质是任意键值存储，与产物集的目录存储相互独立。

mod kv;
mod manager;
mod types;

pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use manager::{DraftManager, DRAFT_KEY_PREFIX};
pub use types::Draft;

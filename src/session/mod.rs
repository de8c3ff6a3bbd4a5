//! 会话附件模块
//!
//! 提供以下功能：
//! - 显式的会话上下文（替代进程级的会话 -> 附件映射）
//! - data URL 图片解析与大小校验
//! - 附件逐个落盘与移除

mod asset;
mod attachments;
mod context;

pub use asset::{decode_data_url, AssetFormat, AttachedAsset, DecodedImage};
pub use attachments::{AttachmentService, IMAGES_DIR};
pub use context::SessionContext;

//! 会话附件类型与编码解析

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, Result};

/// 图片格式
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    Webp,
    Svg,
    Bmp,
}

impl AssetFormat {
    /// 文件扩展名（同时作为格式标签）
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Svg => "svg",
            Self::Bmp => "bmp",
        }
    }

    /// 根据扩展名识别格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// 根据 MIME 子类型识别格式（如 `jpeg`、`svg+xml`）
    pub fn from_mime_subtype(subtype: &str) -> Option<Self> {
        let subtype = subtype.trim().to_lowercase();
        let base = subtype.split('+').next().unwrap_or("");
        Self::from_extension(base)
    }

    /// 根据文件名识别格式，无法识别时返回默认格式
    pub fn from_file_name(name: &str) -> Self {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// 会话附件
///
/// 在被打包进产物集之前由所属的 `SessionContext` 独占。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedAsset {
    /// 附件 ID
    pub id: String,
    /// 所属会话 ID
    pub session_id: String,
    /// 原始显示名称
    pub name: String,
    pub format: AssetFormat,
    /// 文件大小（字节）
    pub size: u64,
    /// 磁盘绝对路径
    pub path: PathBuf,
    /// 创建时间（Unix 时间戳，毫秒）
    pub created_at: i64,
}

impl AttachedAsset {
    /// 打包后的文件名：`<id>.<format>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.format.extension())
    }
}

/// 解码后的图片数据
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// data URL 中声明的格式，无法识别时为 None
    pub format: Option<AssetFormat>,
    pub bytes: Vec<u8>,
}

/// 解析 `data:image/<format>;base64,<payload>`
pub fn decode_data_url(data: &str) -> Result<DecodedImage> {
    let data = data.trim();
    let rest = data
        .strip_prefix("data:")
        .ok_or_else(|| ArtifactError::InvalidEncoding("缺少 data: 前缀".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ArtifactError::InvalidEncoding("缺少数据分隔符".to_string()))?;

    // image/png;base64 -> ("image/png", "base64")
    let (media_type, encoding) = header
        .split_once(';')
        .ok_or_else(|| ArtifactError::InvalidEncoding("缺少编码声明".to_string()))?;
    if !encoding.eq_ignore_ascii_case("base64") {
        return Err(ArtifactError::InvalidEncoding(format!(
            "不支持的编码: {}",
            encoding
        )));
    }
    let subtype = media_type
        .strip_prefix("image/")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ArtifactError::InvalidEncoding(format!("不是图片类型: {}", media_type)))?;

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if payload.is_empty() {
        return Err(ArtifactError::InvalidEncoding("图片数据为空".to_string()));
    }
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| ArtifactError::InvalidEncoding(format!("base64 解码失败: {}", e)))?;

    Ok(DecodedImage {
        format: AssetFormat::from_mime_subtype(subtype),
        bytes,
    })
}

//! 合成文档渲染
//!
//! 提交时在正文末尾追加固定的附件章节，列出成功打包的图片。

use std::path::PathBuf;

/// 合成文档文件名
pub const SPEC_FILE: &str = "spec.md";

/// 附件章节标题
pub const ATTACHMENTS_HEADING: &str = "## Attachments";

/// 已打包的附件
#[derive(Debug, Clone)]
pub struct BundledAsset {
    pub id: String,
    /// 原始显示名称
    pub name: String,
    /// 打包后的绝对路径
    pub path: PathBuf,
}

/// 渲染合成文档
///
/// 没有附件时正文原样返回（仅保证以换行结尾）。
pub fn render_composite(body: &str, attachments: &[BundledAsset]) -> String {
    let mut out = body.trim_end().to_string();
    if attachments.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        return out;
    }

    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(ATTACHMENTS_HEADING);
    out.push_str("\n\n");
    for asset in attachments {
        out.push_str(&format!(
            "- ![{}]({})\n",
            escape_alt(&asset.name),
            asset.path.display()
        ));
    }
    out
}

/// 图片替代文本中的方括号会打断 markdown 语法
fn escape_alt(name: &str) -> String {
    name.replace('[', "\\[").replace(']', "\\]")
}

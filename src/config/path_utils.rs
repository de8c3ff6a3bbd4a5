//! 路径工具：`~` 展开与折叠

use std::path::{Path, PathBuf};

/// 路径是否以 `~` 开头
pub fn contains_tilde(path: &str) -> bool {
    path == "~" || path.starts_with("~/")
}

/// 将 `~` 展开为用户主目录；无法获取主目录时原样返回
pub fn expand_tilde(path: &str) -> PathBuf {
    if !contains_tilde(path) {
        return PathBuf::from(path);
    }
    match dirs::home_dir() {
        Some(home) if path == "~" => home,
        Some(home) => home.join(&path[2..]),
        None => PathBuf::from(path),
    }
}

/// 将主目录前缀折叠为 `~`，用于写回配置文件
pub fn collapse_tilde(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

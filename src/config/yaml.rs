//! YAML 配置读写

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::Config;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] io::Error),
    #[error("解析配置文件失败: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// 默认配置文件路径：`~/.specdraft/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".specdraft").join("config.yaml"))
}

/// 加载配置，文件不存在时返回默认配置
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!("[CONFIG] 配置文件不存在，使用默认配置: {:?}", path);
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// 保存配置为 YAML
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)?;
    fs::write(path, content)?;
    tracing::info!("[CONFIG] 配置已保存: {:?}", path);
    Ok(())
}

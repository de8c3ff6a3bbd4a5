//! 配置管理模块
//!
//! 提供 YAML 配置文件的读写，以及存储路径中 `~` 的展开与折叠。

mod path_utils;
mod types;
mod yaml;

pub use path_utils::{collapse_tilde, contains_tilde, expand_tilde};
pub use types::{Config, LimitsConfig, LoggingConfig, RetentionConfig, StorageConfig};
pub use yaml::{default_config_path, load_config, save_config, ConfigError};

//! 日志初始化

use tracing::Level;

use crate::config::LoggingConfig;

/// 解析日志级别字符串，无法识别时使用 info
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// 安装全局 fmt subscriber
///
/// 宿主已经安装过 subscriber 时返回 false，不会覆盖。
pub fn init_logging(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(config.with_target)
        .try_init()
        .is_ok()
}

//! 日志初始化
//!
//! 默认级别取自配置 `log_level`，设置了 `RUST_LOG` 时以环境变量为准。

use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_DIRECTIVE: &str = "info";

/// 由配置级别构造过滤器，无法解析时回退到 info
pub fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level.trim()).unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// 初始化全局订阅者，重复调用无副作用
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level));
    if fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("[Logger] 订阅者已存在，跳过初始化");
    }
}

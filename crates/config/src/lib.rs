//! 配置模块
//!
//! 启动时解析一次得到 [`ChatConfig`]，通过 [`ConfigHandle`] 注入编排器；
//! 运行期可修改的设置（预算模式、降级深度等）都经由句柄读取。
//!
//! ## 模块结构
//! - `types` - 配置结构与默认值
//! - `loader` - YAML 加载与保存
//! - `handle` - 共享访问句柄

mod handle;
mod loader;
mod types;

pub use handle::ConfigHandle;
pub use loader::{load_config, save_config, ConfigError, CONFIG_PATH_ENV, API_KEY_ENV};
pub use types::{ApiKey, ChatConfig, RoutingSettings, SpecialResponseSettings};

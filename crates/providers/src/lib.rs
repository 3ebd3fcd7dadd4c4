//! 服务商接入
//!
//! ## 模块结构
//! - `openrouter` - OpenAI 兼容客户端：请求体、SSE 解码、HTTP 错误映射、模型列表
//! - `catalog` - 带 TTL 缓存的模型目录

pub mod catalog;
pub mod openrouter;

pub use catalog::{CachedModelCatalog, ModelSource};
pub use openrouter::OpenRouterClient;

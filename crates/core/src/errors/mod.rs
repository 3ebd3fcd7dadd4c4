//! 错误类型模块
//!
//! ## 模块结构
//! - `failure`: 传输调用边界上的原始失败（ChatFailure, ProviderError, TransportError）
//! - `classifier`: 错误分类（ChatErrorCategory, ClassifiedChatError, ErrorClassifier）

mod classifier;
mod failure;

pub use classifier::{ChatErrorCategory, ClassifiedChatError, ErrorClassifier};
pub use failure::{ChatFailure, ProviderError, TransportError, TransportErrorKind};

//! 数据模型模块
//!
//! - `message` - 对话消息、指标与路由元数据
//! - `media` - 多媒体附件
//! - `ai_model` - 模型目录条目与价格
//! - `identity` - 轮次稳定标识

mod ai_model;
mod identity;
mod media;
mod message;

pub use ai_model::{parse_price, AIModel, ModelPricing, ModelProvider};
pub use identity::{make_base_id, make_item_id, ItemKind, TurnIdentity};
pub use media::{MediaContent, MediaType};
pub use message::{Message, MessageMetrics, MessageRole, RoutingMetadata, RoutingMode};

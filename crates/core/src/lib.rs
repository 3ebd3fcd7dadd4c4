//! easyAI 对话编排核心类型
//!
//! 包含消息模型、错误分类、意图识别、上下文构建、模型路由与降级、
//! 渲染行构建与流式 diff 规划等纯逻辑组件，以及对外协作方的 trait 定义。
//!
//! ## 模块结构
//! - `models` - 消息、媒体、模型与标识
//! - `errors` - 失败输入与错误分类
//! - `intent` - 任务意图识别
//! - `special_response` - 身份类问题拦截
//! - `context` - 请求上下文构建
//! - `orchestrator` - 预算模式、模型路由、降级规划
//! - `render` - 渲染行、状态文案、流式 diff
//! - `metrics` - Token/费用估算
//! - `sanitizer` - 凭证脱敏
//! - `transport` / `catalog` - 传输层与模型目录抽象

pub mod catalog;
pub mod context;
pub mod errors;
pub mod intent;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod sanitizer;
pub mod special_response;
pub mod transport;

pub use catalog::{ModelCatalog, ModelFilter};
pub use context::{ContextBuilder, ContextStrategy};
pub use errors::{
    ChatErrorCategory, ChatFailure, ClassifiedChatError, ErrorClassifier, ProviderError,
    TransportError, TransportErrorKind,
};
pub use intent::{IntentClassifier, TaskIntent, TaskType};
pub use models::{
    AIModel, MediaContent, MediaType, Message, MessageMetrics, MessageRole, ModelPricing,
    ItemKind, ModelProvider, RoutingMetadata, RoutingMode, TurnIdentity,
};
pub use orchestrator::{BudgetMode, FallbackPlanner, FallbackSettings, ModelRouter, RoutingDecision};
pub use render::{
    build_rows, ChatListSnapshot, ChatListState, ChatRow, ChatTableUpdateAction, StopNotice,
    StreamDiffPlanner,
};
pub use special_response::SpecialResponsePolicy;
pub use transport::{
    ChatTransport, Completion, CompletionRequest, StreamEvent, TokenStream, TokenUsage,
};

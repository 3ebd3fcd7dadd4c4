//! 对话轮次处理
//!
//! 把核心组件组装成完整的一轮对话：意图识别、路由、上下文构建、
//! 流式/一次性发送、降级重试、取消与错误收尾。
//!
//! ## 模块结构
//! - `orchestrator` - 轮次编排器
//! - `turn` - 单轮上下文与结束原因
//! - `state` - 对话状态事件与 reduce
//! - `store` - 状态存储与快照广播
//! - `persistence` - 持久化 trait 与内存实现

pub mod orchestrator;
pub mod persistence;
pub mod state;
pub mod store;
pub mod turn;

pub use orchestrator::{TurnOrchestrator, TurnOutcome};
pub use persistence::{ChatPersistence, InMemoryPersistence, PersistenceError};
pub use state::{reduce, ChatEvent, ChatState};
pub use store::ConversationStore;
pub use turn::{TurnContext, TurnEndReason};

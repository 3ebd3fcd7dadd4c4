//! easyAI - 移动端 LLM 对话客户端的编排核心
//!
//! 主 crate 只负责装配与日志初始化，逻辑都在各子 crate 中。
//!
//! ## Workspace 结构
//!
//! - easyai-core：消息模型、错误分类、意图识别、路由与降级、渲染规划
//! - easyai-config：配置加载与共享句柄
//! - easyai-providers：OpenRouter 传输层与模型目录缓存
//! - easyai-processor：轮次编排、对话状态与持久化

pub mod logger;

use std::sync::Arc;

pub use easyai_config::{load_config, save_config, ChatConfig, ConfigError, ConfigHandle};
pub use easyai_core::{
    AIModel, ChatErrorCategory, ChatFailure, ChatListSnapshot, ChatRow, ChatTableUpdateAction,
    ClassifiedChatError, MediaContent, Message,
};
pub use easyai_processor::{
    ChatEvent, ChatPersistence, ConversationStore, InMemoryPersistence, TurnEndReason,
    TurnOrchestrator, TurnOutcome,
};
pub use easyai_providers::{CachedModelCatalog, OpenRouterClient};

/// 装配默认编排器：OpenRouter 传输、带缓存的模型目录和给定的持久化实现
pub fn create_orchestrator(
    config: ConfigHandle,
    persistence: Arc<dyn ChatPersistence>,
) -> Result<TurnOrchestrator, ChatFailure> {
    let client = OpenRouterClient::new(config.clone())?;
    let ttl_secs = config.read(|c| c.model_cache_ttl_secs);
    let catalog = CachedModelCatalog::new(client.clone(), ttl_secs);

    tracing::info!("[App] 编排器已创建: ttl={}s", ttl_secs);
    Ok(TurnOrchestrator::new(
        Arc::new(client),
        Arc::new(catalog),
        persistence,
        config,
    ))
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

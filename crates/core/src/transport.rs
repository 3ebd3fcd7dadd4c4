//! 传输层抽象
//!
//! 编排器只依赖这里的 trait：一次性返回完整文本，或返回按到达顺序产出文本增量的惰性流。
//! 流被丢弃即停止读取，用于中途取消。

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::ChatFailure;
use crate::models::Message;

/// 服务端返回的用量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// 补全请求
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// 已按上下文策略处理过的消息窗口
    pub messages: Vec<Message>,
    /// 服务商侧模型 ID
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// 服务端降级备选
    pub fallback_models: Vec<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            max_tokens: 1000,
            temperature: 0.7,
            fallback_models: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }

    /// 是否携带附件
    pub fn has_media(&self) -> bool {
        self.messages.iter().any(Message::has_media)
    }
}

/// 非流式结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// 流式事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// 文本增量
    Delta(String),
    /// 流末尾的用量统计
    Usage(TokenUsage),
}

/// 文本增量流
pub type TokenStream = BoxStream<'static, Result<StreamEvent, ChatFailure>>;

/// 传输层
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 一次性请求
    async fn send_once(&self, request: CompletionRequest) -> Result<Completion, ChatFailure>;

    /// 流式请求
    async fn stream_tokens(&self, request: CompletionRequest) -> Result<TokenStream, ChatFailure>;
}

//! 对话消息模型
//!
//! 消息在流式输出期间原地追加内容，`was_streamed` 在流结束后置位且不再回退，
//! 用于区分"已流式输出完毕"与"从未流式输出"。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::media::MediaContent;
use crate::orchestrator::BudgetMode;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    /// 协议中的角色字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// 单条回复的用量与耗时
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost_usd: Option<f64>,
    /// 用量来自本地估算而非服务端返回
    pub is_estimated: bool,
}

/// 路由模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    #[default]
    Auto,
    Manual,
}

/// 路由元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_model_id: Option<String>,
    pub to_model_id: String,
    pub reason: String,
    pub mode: RoutingMode,
    pub budget_mode: BudgetMode,
    pub timestamp: DateTime<Utc>,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default)]
    pub was_streamed: bool,
    #[serde(default)]
    pub media_contents: Vec<MediaContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MessageMetrics>,
    /// 运行时状态，例如降级提示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_metadata: Option<RoutingMetadata>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role,
            timestamp: Utc::now(),
            is_streaming: false,
            was_streamed: false,
            media_contents: Vec::new(),
            turn_id: None,
            base_id: None,
            item_id: None,
            metrics: None,
            runtime_status_text: None,
            routing_metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn with_media(mut self, media: Vec<MediaContent>) -> Self {
        self.media_contents = media;
        self
    }

    /// 绑定轮次标识
    pub fn with_identity(mut self, turn_id: Uuid, base_id: &str, item_id: String) -> Self {
        self.turn_id = Some(turn_id);
        self.base_id = Some(base_id.to_string());
        self.item_id = Some(item_id);
        self
    }

    /// 标记为流式占位消息
    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }

    pub fn with_runtime_status(mut self, status: Option<String>) -> Self {
        self.runtime_status_text = status;
        self
    }

    pub fn has_media(&self) -> bool {
        !self.media_contents.is_empty()
    }

    /// 结束流式输出
    pub fn finish_streaming(&mut self) {
        if self.is_streaming {
            self.is_streaming = false;
            self.was_streamed = true;
        }
    }

    /// 内容字符数
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(MessageRole::System.as_str(), "system");
    }

    #[test]
    fn test_finish_streaming_is_sticky() {
        let mut msg = Message::assistant("").streaming();
        assert!(msg.is_streaming);
        assert!(!msg.was_streamed);

        msg.finish_streaming();
        assert!(!msg.is_streaming);
        assert!(msg.was_streamed);

        msg.finish_streaming();
        assert!(msg.was_streamed);
    }

    #[test]
    fn test_non_streamed_message_never_marked() {
        let mut msg = Message::assistant("done");
        msg.finish_streaming();
        assert!(!msg.was_streamed);
    }

    #[test]
    fn test_message_deserialize_defaults() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "content": "hi",
            "role": "user",
            "timestamp": Utc::now(),
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(!msg.is_streaming);
        assert!(msg.media_contents.is_empty());
        assert!(msg.metrics.is_none());
    }
}

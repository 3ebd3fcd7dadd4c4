//! 持久化抽象
//!
//! 编排器只在固定时点调用：轮次开始保存用户消息，轮次结束保存助手回复并刷新会话时间。
//! 持久化失败只记录日志，不影响本轮结果。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use easyai_core::Message;

/// 持久化错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("消息不存在: {0}")]
    NotFound(Uuid),
    #[error("存储错误: {0}")]
    Storage(String),
}

/// 消息持久化
#[async_trait]
pub trait ChatPersistence: Send + Sync {
    /// 按时间顺序加载会话消息
    async fn load_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PersistenceError>;

    async fn save_message(&self, conversation_id: &str, message: &Message) -> Result<(), PersistenceError>;

    /// 覆盖已保存的消息
    async fn update_message(&self, conversation_id: &str, message: &Message) -> Result<(), PersistenceError>;

    /// 刷新会话的最近活动时间
    async fn touch_conversation(&self, conversation_id: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default)]
struct StoredConversation {
    messages: Vec<Message>,
    updated_at: Option<DateTime<Utc>>,
}

/// 内存实现
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    conversations: RwLock<HashMap<String, StoredConversation>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 会话最近活动时间
    pub fn updated_at(&self, conversation_id: &str) -> Option<DateTime<Utc>> {
        self.conversations
            .read()
            .get(conversation_id)
            .and_then(|c| c.updated_at)
    }

    /// 已保存的会话 ID
    pub fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.conversations.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ChatPersistence for InMemoryPersistence {
    async fn load_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PersistenceError> {
        Ok(self
            .conversations
            .read()
            .get(conversation_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default())
    }

    async fn save_message(&self, conversation_id: &str, message: &Message) -> Result<(), PersistenceError> {
        let mut conversations = self.conversations.write();
        let conversation = conversations.entry(conversation_id.to_string()).or_default();
        // 同一 ID 重复保存视为覆盖
        match conversation.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => conversation.messages.push(message.clone()),
        }
        Ok(())
    }

    async fn update_message(&self, conversation_id: &str, message: &Message) -> Result<(), PersistenceError> {
        let mut conversations = self.conversations.write();
        let existing = conversations
            .get_mut(conversation_id)
            .and_then(|c| c.messages.iter_mut().find(|m| m.id == message.id))
            .ok_or(PersistenceError::NotFound(message.id))?;
        *existing = message.clone();
        Ok(())
    }

    async fn touch_conversation(&self, conversation_id: &str) -> Result<(), PersistenceError> {
        self.conversations
            .write()
            .entry(conversation_id.to_string())
            .or_default()
            .updated_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_in_order() {
        let store = InMemoryPersistence::new();
        store.save_message("c1", &Message::user("q")).await.unwrap();
        store.save_message("c1", &Message::assistant("a")).await.unwrap();
        store.save_message("c2", &Message::user("other")).await.unwrap();

        let messages = store.load_messages("c1").await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q", "a"]);
        assert!(store.load_messages("missing").await.unwrap().is_empty());
        assert_eq!(store.conversation_ids(), vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_update_message() {
        let store = InMemoryPersistence::new();
        let mut message = Message::assistant("draft");
        store.save_message("c1", &message).await.unwrap();

        message.content = "final".to_string();
        store.update_message("c1", &message).await.unwrap();
        assert_eq!(store.load_messages("c1").await.unwrap()[0].content, "final");

        let unknown = Message::assistant("x");
        assert_eq!(
            store.update_message("c1", &unknown).await.unwrap_err(),
            PersistenceError::NotFound(unknown.id)
        );
    }

    #[tokio::test]
    async fn test_touch_conversation() {
        let store = InMemoryPersistence::new();
        assert!(store.updated_at("c1").is_none());
        store.touch_conversation("c1").await.unwrap();
        assert!(store.updated_at("c1").is_some());
    }
}

//! 对话状态与事件
//!
//! 所有对消息列表、加载标记和停止提示的修改都表示为 [`ChatEvent`]，
//! 经 [`reduce`] 得到新状态。reduce 是纯函数，不做 IO，不打日志。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use easyai_core::{ChatListState, Message, StopNotice};

/// 对话状态
pub type ChatState = ChatListState;

/// 状态事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// 追加消息
    MessageAppended { message: Message },
    /// 向消息追加一段流式增量
    ContentUpdated { message_id: Uuid, delta: String },
    /// 流式输出结束
    StreamFinalized { message_id: Uuid },
    /// 整体替换一条消息（指标、状态行）
    MessageUpdated { message: Message },
    /// 移除消息，连同指向它的停止提示
    MessageRemoved { message_id: Uuid },
    LoadingChanged { is_loading: bool },
    StopNoticeAdded { notice: StopNotice },
    /// 切换会话，重置全部状态
    ConversationSwitched {
        conversation_id: String,
        messages: Vec<Message>,
    },
    /// 只保留最近的 `max_messages` 条
    HistoryTrimmed { max_messages: usize },
}

impl ChatEvent {
    /// 事件名，用于日志
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::MessageAppended { .. } => "message_appended",
            ChatEvent::ContentUpdated { .. } => "content_updated",
            ChatEvent::StreamFinalized { .. } => "stream_finalized",
            ChatEvent::MessageUpdated { .. } => "message_updated",
            ChatEvent::MessageRemoved { .. } => "message_removed",
            ChatEvent::LoadingChanged { .. } => "loading_changed",
            ChatEvent::StopNoticeAdded { .. } => "stop_notice_added",
            ChatEvent::ConversationSwitched { .. } => "conversation_switched",
            ChatEvent::HistoryTrimmed { .. } => "history_trimmed",
        }
    }
}

fn find_mut<'a>(messages: &'a mut [Message], id: &Uuid) -> Option<&'a mut Message> {
    messages.iter_mut().find(|m| m.id == *id)
}

/// 状态迁移
///
/// 指向不存在消息的事件不改变状态。
pub fn reduce(mut state: ChatState, event: &ChatEvent) -> ChatState {
    match event {
        ChatEvent::MessageAppended { message } => {
            state.messages.push(message.clone());
        }
        ChatEvent::ContentUpdated { message_id, delta } => {
            if let Some(message) = find_mut(&mut state.messages, message_id) {
                message.content.push_str(delta);
            }
        }
        ChatEvent::StreamFinalized { message_id } => {
            if let Some(message) = find_mut(&mut state.messages, message_id) {
                message.finish_streaming();
            }
        }
        ChatEvent::MessageUpdated { message } => {
            if let Some(existing) = find_mut(&mut state.messages, &message.id) {
                *existing = message.clone();
            }
        }
        ChatEvent::MessageRemoved { message_id } => {
            state.messages.retain(|m| m.id != *message_id);
            state
                .stop_notices
                .retain(|n| n.message_id != Some(*message_id));
        }
        ChatEvent::LoadingChanged { is_loading } => {
            state.is_loading = *is_loading;
        }
        ChatEvent::StopNoticeAdded { notice } => {
            state.stop_notices.push(notice.clone());
        }
        ChatEvent::ConversationSwitched {
            conversation_id,
            messages,
        } => {
            state = ChatState {
                conversation_id: conversation_id.clone(),
                messages: messages.clone(),
                is_loading: false,
                stop_notices: Vec::new(),
            };
        }
        ChatEvent::HistoryTrimmed { max_messages } => {
            let overflow = state.messages.len().saturating_sub(*max_messages);
            if overflow > 0 {
                let dropped: Vec<Uuid> = state.messages.drain(..overflow).map(|m| m.id).collect();
                state
                    .stop_notices
                    .retain(|n| n.message_id.map_or(true, |id| !dropped.contains(&id)));
            }
        }
    }
    state
}

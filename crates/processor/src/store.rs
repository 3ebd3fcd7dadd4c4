//! 对话状态存储
//!
//! [`ConversationStore`] 是状态的唯一写入方：事件在互斥锁内依次 reduce，
//! 每次提交后相对上一次发布的状态生成 [`ChatListSnapshot`]，经 broadcast 通道推送给渲染层。

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use easyai_core::{ChatListSnapshot, Message};

use crate::state::{reduce, ChatEvent, ChatState};

const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct StoreInner {
    /// 与最近一次发布的快照共享
    state: Arc<ChatState>,
    published: bool,
}

/// 对话状态存储
#[derive(Debug)]
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
    sender: broadcast::Sender<ChatListSnapshot>,
    max_stored_messages: usize,
}

impl ConversationStore {
    pub fn new(conversation_id: impl Into<String>, max_stored_messages: usize) -> Self {
        let (sender, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        let state = ChatState {
            conversation_id: conversation_id.into(),
            ..Default::default()
        };
        Self {
            inner: Mutex::new(StoreInner {
                state: Arc::new(state),
                published: false,
            }),
            sender,
            max_stored_messages: max_stored_messages.max(1),
        }
    }

    /// 订阅快照
    pub fn subscribe(&self) -> broadcast::Receiver<ChatListSnapshot> {
        self.sender.subscribe()
    }

    /// 当前状态副本
    pub fn state(&self) -> ChatState {
        ChatState::clone(&self.inner.lock().state)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().state.messages.clone()
    }

    pub fn conversation_id(&self) -> String {
        self.inner.lock().state.conversation_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.is_loading
    }

    pub fn find_message(&self, id: Uuid) -> Option<Message> {
        self.inner
            .lock()
            .state
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// 提交单个事件
    pub fn dispatch(&self, event: ChatEvent) -> ChatListSnapshot {
        self.dispatch_all(vec![event])
    }

    /// 批量提交，只发布一次快照
    pub fn dispatch_all(&self, events: Vec<ChatEvent>) -> ChatListSnapshot {
        let snapshot = {
            let mut inner = self.inner.lock();
            self.commit(&mut inner, &events)
        };
        self.publish(snapshot)
    }

    /// 仅当当前会话仍是 `conversation_id` 时提交
    ///
    /// 轮次的事件都经这里提交，会话切换后迟到的事件被丢弃。
    pub fn dispatch_for(
        &self,
        conversation_id: &str,
        events: Vec<ChatEvent>,
    ) -> Option<ChatListSnapshot> {
        let snapshot = {
            let mut inner = self.inner.lock();
            if inner.state.conversation_id != conversation_id {
                tracing::debug!(
                    "[ChatStore] 会话已切换，丢弃 {} 的事件: {}",
                    conversation_id,
                    events.iter().map(ChatEvent::name).collect::<Vec<_>>().join(",")
                );
                return None;
            }
            self.commit(&mut inner, &events)
        };
        Some(self.publish(snapshot))
    }

    fn commit(&self, inner: &mut StoreInner, events: &[ChatEvent]) -> ChatListSnapshot {
        let mut state = ChatState::clone(&inner.state);
        for event in events {
            state = reduce(state, event);
        }
        if state.messages.len() > self.max_stored_messages {
            tracing::debug!(
                "[ChatStore] 消息数 {} 超过上限 {}，裁剪旧消息",
                state.messages.len(),
                self.max_stored_messages
            );
            state = reduce(
                state,
                &ChatEvent::HistoryTrimmed {
                    max_messages: self.max_stored_messages,
                },
            );
        }

        let state = Arc::new(state);
        let previous = inner.published.then(|| inner.state.as_ref());
        let snapshot = ChatListSnapshot::derive(previous, state.clone());
        inner.state = state;
        inner.published = true;
        snapshot
    }

    fn publish(&self, snapshot: ChatListSnapshot) -> ChatListSnapshot {
        // 没有订阅者时发送失败，忽略
        let _ = self.sender.send(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easyai_core::{ChatRow, ChatTableUpdateAction};

    #[test]
    fn test_streaming_update_reloads_last_row() {
        let store = ConversationStore::new("conv-1", 200);
        let mut rx = store.subscribe();

        store.dispatch(ChatEvent::MessageAppended {
            message: Message::user("hi"),
        });
        let placeholder = Message::assistant("").streaming();
        let id = placeholder.id;
        let first = store.dispatch(ChatEvent::MessageAppended {
            message: placeholder,
        });
        assert_eq!(first.action, ChatTableUpdateAction::BindSections);

        store.dispatch(ChatEvent::ContentUpdated {
            message_id: id,
            delta: "Hel".to_string(),
        });
        let update = store.dispatch(ChatEvent::ContentUpdated {
            message_id: id,
            delta: "lo".to_string(),
        });
        assert_eq!(update.action, ChatTableUpdateAction::StreamingReloadLastRow);
        assert_eq!(store.find_message(id).unwrap().content, "Hello");

        let closed = store.dispatch(ChatEvent::StreamFinalized { message_id: id });
        assert_eq!(closed.action, ChatTableUpdateAction::BindSections);

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 5);
    }

    #[test]
    fn test_dispatch_all_publishes_once() {
        let store = ConversationStore::new("conv-1", 200);
        let mut rx = store.subscribe();
        let snapshot = store.dispatch_all(vec![
            ChatEvent::MessageAppended {
                message: Message::user("a"),
            },
            ChatEvent::LoadingChanged { is_loading: true },
        ]);
        assert!(matches!(snapshot.rows.last(), Some(ChatRow::Loading)));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_store_caps_history() {
        let store = ConversationStore::new("conv-1", 3);
        for i in 0..5 {
            store.dispatch(ChatEvent::MessageAppended {
                message: Message::user(format!("m{i}")),
            });
        }
        let contents: Vec<String> = store.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_dispatch_for_drops_stale_conversation() {
        let store = ConversationStore::new("conv-1", 10);
        store.dispatch(ChatEvent::ConversationSwitched {
            conversation_id: "conv-2".to_string(),
            messages: vec![],
        });
        let mut rx = store.subscribe();

        let dropped = store.dispatch_for(
            "conv-1",
            vec![
                ChatEvent::StopNoticeAdded {
                    notice: easyai_core::StopNotice::stopped(None),
                },
                ChatEvent::LoadingChanged { is_loading: false },
            ],
        );
        assert!(dropped.is_none());
        assert!(store.state().stop_notices.is_empty());
        assert!(rx.try_recv().is_err());

        let applied = store.dispatch_for("conv-2", vec![ChatEvent::LoadingChanged { is_loading: true }]);
        assert!(applied.is_some_and(|s| s.state.is_loading));
    }

    #[test]
    fn test_snapshot_shares_media_bytes() {
        let store = ConversationStore::new("conv-1", 10);
        let message = Message::user("").with_media(vec![easyai_core::MediaContent::image(vec![7; 64], "image/png")]);
        let first = store.dispatch(ChatEvent::MessageAppended { message });
        let second = store.dispatch(ChatEvent::LoadingChanged { is_loading: true });

        let a = &first.state.messages[0].media_contents[0].data;
        let b = &second.state.messages[0].media_contents[0].data;
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_dispatch_without_subscribers() {
        let store = ConversationStore::new("conv-1", 10);
        let snapshot = store.dispatch(ChatEvent::LoadingChanged { is_loading: true });
        assert!(snapshot.state.is_loading);
        assert!(store.is_loading());
    }
}

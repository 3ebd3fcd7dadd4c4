//! 流式更新规划
//!
//! 比较前后两个列表状态，决定整表重绑还是只刷新最后一行。
//! 只有"同一条正在流式输出的消息仅文本变长"这一种情况走局部刷新。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::rows::{build_rows, ChatRow, StopNotice};
use crate::models::Message;

/// 列表更新动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatTableUpdateAction {
    /// 整表重建
    BindSections,
    /// 只刷新最后一条消息所在行
    StreamingReloadLastRow,
}

/// 列表状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatListState {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub stop_notices: Vec<StopNotice>,
}

impl ChatListState {
    pub fn rows(&self) -> Vec<ChatRow> {
        build_rows(&self.messages, self.is_loading, &self.stop_notices)
    }
}

/// 交给渲染层的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatListSnapshot {
    /// 与存储共享，不随快照复制
    pub state: Arc<ChatListState>,
    pub rows: Vec<ChatRow>,
    pub action: ChatTableUpdateAction,
}

impl ChatListSnapshot {
    /// 相对上一个状态生成快照
    pub fn derive(previous: Option<&ChatListState>, state: impl Into<Arc<ChatListState>>) -> Self {
        let state = state.into();
        let action = StreamDiffPlanner::plan(previous, &state);
        let rows = state.rows();
        Self { state, rows, action }
    }
}

/// 流式 diff 规划器
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDiffPlanner;

impl StreamDiffPlanner {
    /// 规划更新动作
    pub fn plan(previous: Option<&ChatListState>, current: &ChatListState) -> ChatTableUpdateAction {
        use ChatTableUpdateAction::*;

        let Some(previous) = previous else {
            return BindSections;
        };
        if previous.conversation_id != current.conversation_id
            || previous.is_loading != current.is_loading
            || previous.stop_notices != current.stop_notices
            || previous.messages.len() != current.messages.len()
        {
            return BindSections;
        }

        let (Some(prev_last), Some(curr_last)) = (previous.messages.last(), current.messages.last())
        else {
            return BindSections;
        };
        if prev_last.id != curr_last.id {
            return BindSections;
        }
        // 进入流式状态需要插入新行
        if !curr_last.is_streaming || !prev_last.is_streaming {
            return BindSections;
        }
        if prev_last.was_streamed != curr_last.was_streamed {
            return BindSections;
        }
        // 空占位不渲染，首个分片会新增一行
        if prev_last.content.is_empty() {
            return BindSections;
        }
        if prev_last.content == curr_last.content || !differs_only_in_content(prev_last, curr_last) {
            return BindSections;
        }

        StreamingReloadLastRow
    }
}

fn differs_only_in_content(prev: &Message, curr: &Message) -> bool {
    let mut aligned = prev.clone();
    aligned.content.clone_from(&curr.content);
    aligned == *curr
}

//! 渲染行构建

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::status::compose_status_text;
use crate::models::{Message, MessageRole};

/// 用户停止生成时的提示文本
pub const STOPPED_NOTICE_TEXT: &str = "已停止生成";

/// 停止提示
///
/// 记录一轮提前结束，独立于消息存在；`message_id` 为空时单独成行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopNotice {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl StopNotice {
    pub fn new(message_id: Option<Uuid>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// 停止生成
    pub fn stopped(message_id: Option<Uuid>) -> Self {
        Self::new(message_id, STOPPED_NOTICE_TEXT)
    }
}

/// 渲染行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatRow {
    /// 用户文本气泡
    MessageSend { message: Message },
    /// 附件消息
    MessageMedia { message: Message },
    /// 助手 Markdown 气泡，带状态行
    MessageMarkdown {
        message: Message,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_text: Option<String>,
    },
    /// 紧凑的停止提示行
    StopNotice { notice: StopNotice },
    Loading,
}

/// 构建行列表
///
/// 顺序：逐条消息 → 未关联消息的停止提示 → 未能挂到消息上的停止提示 → 加载行。
pub fn build_rows(messages: &[Message], is_loading: bool, stop_notices: &[StopNotice]) -> Vec<ChatRow> {
    let mut rows = Vec::with_capacity(messages.len() + stop_notices.len() + 1);

    let notice_map: HashMap<Uuid, &StopNotice> = stop_notices
        .iter()
        .filter_map(|n| n.message_id.map(|id| (id, n)))
        .collect();
    let mut attached: HashSet<Uuid> = HashSet::new();

    for message in messages {
        if message.has_media() {
            rows.push(ChatRow::MessageMedia {
                message: message.clone(),
            });
            continue;
        }

        let notice = notice_map.get(&message.id);
        if message.role == MessageRole::User {
            if !message.content.trim().is_empty() {
                rows.push(ChatRow::MessageSend {
                    message: message.clone(),
                });
            }
        } else if !message.content.is_empty() {
            let status_text = compose_status_text(
                notice.map(|n| n.text.as_str()),
                message.runtime_status_text.as_deref(),
                message.metrics.as_ref(),
            );
            if status_text.is_some() {
                attached.insert(message.id);
            }
            rows.push(ChatRow::MessageMarkdown {
                message: message.clone(),
                status_text,
            });
        } else if let Some(notice) = notice {
            rows.push(ChatRow::StopNotice {
                notice: (*notice).clone(),
            });
            attached.insert(message.id);
        }
    }

    rows.extend(
        stop_notices
            .iter()
            .filter(|n| n.message_id.is_none())
            .map(|n| ChatRow::StopNotice { notice: n.clone() }),
    );
    rows.extend(
        stop_notices
            .iter()
            .filter(|n| n.message_id.is_some_and(|id| !attached.contains(&id)))
            .map(|n| ChatRow::StopNotice { notice: n.clone() }),
    );

    if is_loading {
        rows.push(ChatRow::Loading);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaContent, MessageMetrics};

    fn kinds(rows: &[ChatRow]) -> Vec<&'static str> {
        rows.iter()
            .map(|r| match r {
                ChatRow::MessageSend { .. } => "send",
                ChatRow::MessageMedia { .. } => "media",
                ChatRow::MessageMarkdown { .. } => "markdown",
                ChatRow::StopNotice { .. } => "stop",
                ChatRow::Loading => "loading",
            })
            .collect()
    }

    #[test]
    fn test_basic_rows() {
        let messages = vec![
            Message::user("hi"),
            Message::user("   "),
            Message::assistant("hello"),
            Message::user("pic").with_media(vec![MediaContent::image(vec![1], "image/png")]),
        ];
        let rows = build_rows(&messages, true, &[]);
        assert_eq!(kinds(&rows), vec!["send", "markdown", "media", "loading"]);
    }

    #[test]
    fn test_empty_assistant_with_notice_becomes_stop_row() {
        let assistant = Message::assistant("");
        let notice = StopNotice::stopped(Some(assistant.id));
        let rows = build_rows(&[Message::user("q"), assistant], false, &[notice.clone()]);
        assert_eq!(kinds(&rows), vec!["send", "stop"]);
        assert_eq!(rows[1], ChatRow::StopNotice { notice });
    }

    #[test]
    fn test_empty_assistant_without_notice_is_hidden() {
        let rows = build_rows(&[Message::assistant("").streaming()], false, &[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_notice_attaches_to_markdown_status() {
        let mut assistant = Message::assistant("partial");
        assistant.metrics = Some(MessageMetrics {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            latency_ms: 200,
            estimated_cost_usd: None,
            is_estimated: true,
        });
        let notice = StopNotice::stopped(Some(assistant.id));
        let rows = build_rows(&[assistant], false, &[notice]);
        assert_eq!(rows.len(), 1);
        match &rows[0] {
            ChatRow::MessageMarkdown { status_text, .. } => {
                assert_eq!(status_text.as_deref(), Some("已停止生成 · 15 tok · 200ms"));
            }
            other => panic!("unexpected row: {other:?}"),
        }
    }

    #[test]
    fn test_unattached_notices_trail() {
        let orphan = StopNotice::new(None, "会话已中断");
        let dangling = StopNotice::stopped(Some(Uuid::new_v4()));
        let rows = build_rows(
            &[Message::user("q")],
            true,
            &[dangling.clone(), orphan.clone()],
        );
        assert_eq!(kinds(&rows), vec!["send", "stop", "stop", "loading"]);
        assert_eq!(rows[1], ChatRow::StopNotice { notice: orphan });
        assert_eq!(rows[2], ChatRow::StopNotice { notice: dangling });
    }
}

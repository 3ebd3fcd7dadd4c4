//! 请求上下文构建
//!
//! 先按条数截取最近的消息窗口（更早的直接丢弃，不做摘要），再按策略处理附件。
//! 被去掉附件且文本为空的消息填入占位文本，避免向服务商发送空内容。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// 附件被剥离后的占位文本
pub const MEDIA_PLACEHOLDER: &str = "（图片）";

/// 上下文策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// 全部上下文，仅当前消息保留附件
    #[default]
    FullContext,
    /// 全部上下文，所有附件都剥离
    TextOnly,
    /// 只发送当前消息
    CurrentOnly,
}

impl ContextStrategy {
    /// 获取显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ContextStrategy::FullContext => "全部上下文",
            ContextStrategy::TextOnly => "仅文本",
            ContextStrategy::CurrentOnly => "仅当前轮",
        }
    }
}

/// 上下文构建器
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 构建发送窗口
    pub fn build(
        &self,
        all_messages: &[Message],
        current: &Message,
        strategy: ContextStrategy,
        max_messages: usize,
    ) -> Vec<Message> {
        let start = all_messages.len().saturating_sub(max_messages);
        let window = &all_messages[start..];

        match strategy {
            ContextStrategy::FullContext => sanitize(window, current.id, true),
            ContextStrategy::TextOnly => sanitize(window, current.id, false),
            ContextStrategy::CurrentOnly => sanitize(std::slice::from_ref(current), current.id, true),
        }
    }
}

fn sanitize(source: &[Message], current_id: Uuid, keep_current_media: bool) -> Vec<Message> {
    source
        .iter()
        .map(|message| {
            let keep_media = keep_current_media && message.id == current_id;
            let mut sanitized = message.clone();
            if !keep_media {
                if sanitized.has_media() && sanitized.content.trim().is_empty() {
                    sanitized.content = MEDIA_PLACEHOLDER.to_string();
                }
                sanitized.media_contents.clear();
            }
            sanitized
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaContent;
    use proptest::prelude::*;

    fn image() -> MediaContent {
        MediaContent::image(vec![0xff, 0xd8], "image/jpeg")
    }

    fn make_history(len: usize) -> Vec<Message> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_full_context_window_keeps_current_media() {
        let mut history = make_history(24);
        let current = Message::user("看看这张图").with_media(vec![image()]);
        history.push(current.clone());

        let result = ContextBuilder::new().build(&history, &current, ContextStrategy::FullContext, 20);
        assert_eq!(result.len(), 20);
        assert_eq!(result[0].content, "a5");
        let last = result.last().unwrap();
        assert_eq!(last.id, current.id);
        assert_eq!(last.media_contents.len(), 1);
    }

    #[test]
    fn test_history_media_replaced_with_placeholder() {
        let old = Message::user("").with_media(vec![image()]);
        let current = Message::user("继续");
        let history = vec![old, current.clone()];

        let result = ContextBuilder::new().build(&history, &current, ContextStrategy::FullContext, 20);
        assert_eq!(result[0].content, MEDIA_PLACEHOLDER);
        assert!(result[0].media_contents.is_empty());
    }

    #[test]
    fn test_text_only_strips_current_media() {
        let current = Message::user("描述一下").with_media(vec![image()]);
        let history = vec![current.clone()];

        let result = ContextBuilder::new().build(&history, &current, ContextStrategy::TextOnly, 20);
        assert!(result[0].media_contents.is_empty());
        assert_eq!(result[0].content, "描述一下");
    }

    #[test]
    fn test_current_only() {
        let history = make_history(5);
        let current = Message::user("only me").with_media(vec![image()]);

        let result = ContextBuilder::new().build(&history, &current, ContextStrategy::CurrentOnly, 20);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, current.id);
        assert_eq!(result[0].media_contents.len(), 1);
    }

    #[test]
    fn test_strategy_serialization() {
        assert_eq!(
            serde_json::to_string(&ContextStrategy::TextOnly).unwrap(),
            "\"text_only\""
        );
        assert_eq!(ContextStrategy::CurrentOnly.display_name(), "仅当前轮");
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        (any::<bool>(), "[a-z ]{0,8}", any::<bool>()).prop_map(|(is_user, content, media)| {
            let msg = if is_user {
                Message::user(content)
            } else {
                Message::assistant(content)
            };
            if media {
                msg.with_media(vec![MediaContent::image(vec![1], "image/png")])
            } else {
                msg
            }
        })
    }

    proptest! {
        #[test]
        fn prop_text_only_never_has_media(
            history in prop::collection::vec(arb_message(), 0..30),
            max in 0usize..25,
        ) {
            let current = Message::user("now").with_media(vec![image()]);
            let mut all = history;
            all.push(current.clone());
            let result = ContextBuilder::new().build(&all, &current, ContextStrategy::TextOnly, max);
            prop_assert!(result.iter().all(|m| m.media_contents.is_empty()));
            prop_assert!(result.len() <= max);
        }

        #[test]
        fn prop_current_only_single(history in prop::collection::vec(arb_message(), 0..30)) {
            let current = Message::user("now");
            let result = ContextBuilder::new().build(&history, &current, ContextStrategy::CurrentOnly, 20);
            prop_assert_eq!(result.len(), 1);
        }

        #[test]
        fn prop_no_empty_content_after_strip(history in prop::collection::vec(arb_message(), 1..30)) {
            let current = Message::user("now");
            let result = ContextBuilder::new().build(&history, &current, ContextStrategy::TextOnly, 50);
            for (sanitized, source) in result.iter().zip(history.iter()) {
                if source.has_media() && source.content.trim().is_empty() {
                    prop_assert_eq!(sanitized.content.as_str(), MEDIA_PLACEHOLDER);
                }
            }
        }
    }
}

//! 任务意图识别
//!
//! 根据消息内容关键词与附件推断任务类型。关键词按固定优先级排列成表：
//! 翻译 → 总结 → 代码 → 写作，首个命中者生效；带附件时直接判定为视觉任务。

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    General,
    Coding,
    Translation,
    Summarization,
    Writing,
    Vision,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::General => "general",
            TaskType::Coding => "coding",
            TaskType::Translation => "translation",
            TaskType::Summarization => "summarization",
            TaskType::Writing => "writing",
            TaskType::Vision => "vision",
        }
    }

    /// 获取显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskType::General => "通用",
            TaskType::Coding => "代码",
            TaskType::Translation => "翻译",
            TaskType::Summarization => "总结",
            TaskType::Writing => "写作",
            TaskType::Vision => "视觉",
        }
    }
}

/// 任务意图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIntent {
    pub task_type: TaskType,
    pub requires_vision: bool,
    /// 候选上下文窗口的总字符数
    pub estimated_context_chars: usize,
    /// 本轮输入字符数
    pub input_length: usize,
}

/// 默认关键词表（按优先级排序，匹配前内容已转小写）
pub const DEFAULT_INTENT_KEYWORDS: &[(TaskType, &[&str])] = &[
    (TaskType::Translation, &["翻译", "translate"]),
    (TaskType::Summarization, &["总结", "摘要", "summary"]),
    (
        TaskType::Coding,
        &["代码", "报错", "debug", "bug", "swift", "python", "javascript"],
    ),
    (TaskType::Writing, &["写", "文案", "润色"]),
];

/// 意图识别器
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<(TaskType, Vec<String>)>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::from_table(DEFAULT_INTENT_KEYWORDS)
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从关键词表创建
    pub fn from_table(table: &[(TaskType, &[&str])]) -> Self {
        let rules = table
            .iter()
            .map(|(task, keywords)| {
                (
                    *task,
                    keywords.iter().map(|k| k.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { rules }
    }

    /// 识别意图
    pub fn classify(&self, content: &str, has_media: bool, history: &[Message]) -> TaskIntent {
        let estimated_context_chars = history.iter().map(Message::char_count).sum();
        let input_length = content.chars().count();

        let task_type = if has_media {
            TaskType::Vision
        } else {
            self.match_keywords(&content.to_lowercase())
        };

        TaskIntent {
            task_type,
            requires_vision: has_media,
            estimated_context_chars,
            input_length,
        }
    }

    fn match_keywords(&self, lowercased: &str) -> TaskType {
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowercased.contains(kw.as_str())))
            .map(|(task, _)| *task)
            .unwrap_or(TaskType::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_media_short_circuits() {
        let intent = IntentClassifier::new().classify("帮我翻译这张图", true, &[]);
        assert_eq!(intent.task_type, TaskType::Vision);
        assert!(intent.requires_vision);
    }

    #[test]
    fn test_keyword_precedence() {
        let classifier = IntentClassifier::new();
        // 翻译优先于代码
        assert_eq!(
            classifier.classify("translate this python snippet", false, &[]).task_type,
            TaskType::Translation
        );
        // 总结优先于写作
        assert_eq!(
            classifier.classify("写一个总结", false, &[]).task_type,
            TaskType::Summarization
        );
        assert_eq!(
            classifier.classify("这段代码报错了", false, &[]).task_type,
            TaskType::Coding
        );
        assert_eq!(
            classifier.classify("帮我润色", false, &[]).task_type,
            TaskType::Writing
        );
        assert_eq!(
            classifier.classify("今天天气怎么样", false, &[]).task_type,
            TaskType::General
        );
    }

    #[test]
    fn test_case_insensitive() {
        let intent = IntentClassifier::new().classify("Fix this BUG please", false, &[]);
        assert_eq!(intent.task_type, TaskType::Coding);
    }

    #[test]
    fn test_context_estimate() {
        let history = vec![Message::user("你好"), Message::assistant("hello")];
        let intent = IntentClassifier::new().classify("再见", false, &history);
        assert_eq!(intent.estimated_context_chars, 7);
        assert_eq!(intent.input_length, 2);
    }

    #[test]
    fn test_custom_table() {
        let classifier =
            IntentClassifier::from_table(&[(TaskType::Writing, &["POEM"] as &[&str])]);
        assert_eq!(
            classifier.classify("write a poem", false, &[]).task_type,
            TaskType::Writing
        );
    }

    proptest! {
        #[test]
        fn prop_classify_is_idempotent(content in ".*", has_media in any::<bool>()) {
            let classifier = IntentClassifier::new();
            let history = vec![Message::user(content.clone())];
            let first = classifier.classify(&content, has_media, &history);
            let second = classifier.classify(&content, has_media, &history);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_media_always_vision(content in ".*") {
            let intent = IntentClassifier::new().classify(&content, true, &[]);
            prop_assert_eq!(intent.task_type, TaskType::Vision);
        }
    }
}

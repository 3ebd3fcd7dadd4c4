//! 身份类问题拦截
//!
//! 用户询问"你是谁/什么模型"一类问题时直接给出固定回答，不走路由与传输。
//! 拦截发生在意图识别之前，带附件的轮次不拦截。

/// 默认回答
pub const DEFAULT_SPECIAL_RESPONSE: &str =
    "您好，我是 easyAI 智能助手，可以为您解答问题、编写代码和翻译润色，请直接告诉我您的需求。";

/// 模型/身份关键词，命中即拦截
const MODEL_KEYWORDS: &[&str] = &[
    "什么模型",
    "谁",
    "你是谁",
    "什么ai",
    "什么模型提供",
    "什么模型支持",
    "什么模型驱动",
    "哪个模型",
    "模型",
    "ai模型",
    "什么助手",
    "哪个助手",
    "你是什么",
];

/// 询问类关键词
const QUESTION_KEYWORDS: &[&str] = &["是什么", "谁做的", "谁开发的", "谁创建的", "谁提供的", "哪个", "什么"];

/// 判断类关键词
const JUDGMENT_KEYWORDS: &[&str] = &["是", "属于", "属于什么", "属于哪个", "属于哪"];

/// 询问类问题需同时涉及的主题
const QUESTION_SUBJECTS: &[&str] = &["模型", "ai", "助手", "你"];

/// 判断类问题需同时涉及的主题
const JUDGMENT_SUBJECTS: &[&str] = &["模型", "ai", "助手"];

/// 身份类问题拦截策略
#[derive(Debug, Clone)]
pub struct SpecialResponsePolicy {
    enabled: bool,
    response_text: String,
}

impl Default for SpecialResponsePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            response_text: DEFAULT_SPECIAL_RESPONSE.to_string(),
        }
    }
}

impl SpecialResponsePolicy {
    pub fn new(enabled: bool, response_text: impl Into<String>) -> Self {
        Self {
            enabled,
            response_text: response_text.into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn response_text(&self) -> &str {
        &self.response_text
    }

    /// 本轮是否拦截
    pub fn intercept(&self, content: &str, has_media: bool) -> Option<&str> {
        if !self.enabled || has_media || !Self::matches(content) {
            return None;
        }
        Some(&self.response_text)
    }

    /// 内容是否属于身份类问题
    pub fn matches(content: &str) -> bool {
        let lower = content.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| lower.contains(kw));

        if contains_any(MODEL_KEYWORDS) {
            return true;
        }
        if contains_any(QUESTION_KEYWORDS) && contains_any(QUESTION_SUBJECTS) {
            return true;
        }
        contains_any(JUDGMENT_KEYWORDS) && contains_any(JUDGMENT_SUBJECTS)
    }
}

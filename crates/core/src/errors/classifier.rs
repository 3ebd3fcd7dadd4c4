//! 错误分类
//!
//! 把 [`ChatFailure`] 映射到封闭的错误类别集合，附带用户可读文案、
//! 技术信息、是否可重试以及恢复建议。分类是纯函数，同一输入总得到同一类别。

use serde::{Deserialize, Serialize};

use super::failure::{ChatFailure, ProviderError, TransportError, TransportErrorKind};
use crate::sanitizer;

const TIMEOUT_MESSAGE: &str = "请求超时，请稍后重试。";
const NETWORK_MESSAGE: &str = "网络异常，请检查网络后重试。";

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatErrorCategory {
    #[serde(rename = "missingAPIKey")]
    MissingApiKey,
    InsufficientCredits,
    InvalidModel,
    ModelNotFound,
    ModelNotSupportMultimodal,
    ContextTooLong,
    RateLimited,
    ServerUnavailable,
    Timeout,
    Network,
    Cancelled,
    Unknown,
}

impl ChatErrorCategory {
    /// 所有类别
    pub const ALL: [ChatErrorCategory; 12] = [
        ChatErrorCategory::MissingApiKey,
        ChatErrorCategory::InsufficientCredits,
        ChatErrorCategory::InvalidModel,
        ChatErrorCategory::ModelNotFound,
        ChatErrorCategory::ModelNotSupportMultimodal,
        ChatErrorCategory::ContextTooLong,
        ChatErrorCategory::RateLimited,
        ChatErrorCategory::ServerUnavailable,
        ChatErrorCategory::Timeout,
        ChatErrorCategory::Network,
        ChatErrorCategory::Cancelled,
        ChatErrorCategory::Unknown,
    ];

    /// 是否可重试
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerUnavailable | Self::Timeout | Self::Network
        )
    }

    /// 换一个模型可能解决的错误
    pub fn is_model_specific(self) -> bool {
        matches!(
            self,
            Self::ModelNotFound | Self::InvalidModel | Self::ModelNotSupportMultimodal
        )
    }

    /// 类别标签
    pub fn label(self) -> &'static str {
        match self {
            Self::RateLimited => "限流",
            Self::InsufficientCredits => "余额不足",
            Self::ContextTooLong => "上下文超限",
            Self::Timeout => "请求超时",
            Self::ServerUnavailable => "服务不可用",
            Self::Network => "网络异常",
            Self::MissingApiKey => "缺少 API Key",
            Self::InvalidModel => "模型无效",
            Self::ModelNotFound => "模型不存在",
            Self::ModelNotSupportMultimodal => "模型不支持多模态",
            Self::Cancelled => "已取消",
            Self::Unknown => "未知错误",
        }
    }

    /// 恢复建议
    pub fn recovery_suggestion(self) -> Option<&'static str> {
        match self {
            Self::RateLimited => Some("请稍后重试，或切换到更稳定的模型。"),
            Self::InsufficientCredits => Some("请检查 OpenRouter 余额或更换免费模型。"),
            Self::ContextTooLong => Some("建议清空部分历史消息后重试。"),
            Self::Timeout => Some("请检查网络后重试，必要时切换模型。"),
            Self::ServerUnavailable => Some("可稍后重试，或临时切换其他模型。"),
            Self::Network => Some("请检查网络连接后重试。"),
            Self::MissingApiKey => Some("请前往设置页填写有效 API Key。"),
            _ => None,
        }
    }
}

/// 分类后的错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedChatError {
    pub category: ChatErrorCategory,
    pub user_message: String,
    pub technical_message: String,
}

impl ClassifiedChatError {
    pub fn new(
        category: ChatErrorCategory,
        user_message: impl Into<String>,
        technical_message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            user_message: user_message.into(),
            technical_message: technical_message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        self.category.recovery_suggestion()
    }

    /// 状态行：`标签：建议`，无建议时只有标签
    pub fn status_message(&self) -> String {
        match self.recovery_suggestion() {
            Some(suggestion) => format!("{}：{}", self.category.label(), suggestion),
            None => self.category.label().to_string(),
        }
    }

    /// 横幅：用户文案后接恢复建议
    pub fn banner_message(&self) -> String {
        match self.recovery_suggestion() {
            Some(suggestion) => format!("{} {}", self.user_message, suggestion),
            None => self.user_message.clone(),
        }
    }
}

/// 错误分类器
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 分类
    pub fn classify(&self, failure: &ChatFailure) -> ClassifiedChatError {
        match failure {
            ChatFailure::Cancelled => {
                ClassifiedChatError::new(ChatErrorCategory::Cancelled, "请求已取消", "cancelled")
            }
            ChatFailure::Provider(err) => Self::classify_provider(err),
            ChatFailure::Transport(err) => Self::classify_transport(err),
            ChatFailure::Other(description) => Self::classify_description(description),
        }
    }

    fn classify_provider(err: &ProviderError) -> ClassifiedChatError {
        use ChatErrorCategory as C;

        match err {
            ProviderError::MissingApiKey => ClassifiedChatError::new(
                C::MissingApiKey,
                "请先在设置中填写 OpenRouter API Key",
                err.to_string(),
            ),
            ProviderError::InsufficientCredits { message } => {
                ClassifiedChatError::new(C::InsufficientCredits, message, redacted(message))
            }
            ProviderError::InvalidModelId { message, .. } => {
                ClassifiedChatError::new(C::InvalidModel, message, redacted(message))
            }
            ProviderError::ModelNotFound { message, .. } => {
                ClassifiedChatError::new(C::ModelNotFound, message, redacted(message))
            }
            ProviderError::ModelNotSupportMultimodal { message, .. } => {
                ClassifiedChatError::new(C::ModelNotSupportMultimodal, message, redacted(message))
            }
            ProviderError::Api {
                status_code,
                message,
            } => Self::classify_api(*status_code, message),
            ProviderError::InvalidResponse => ClassifiedChatError::new(
                C::ServerUnavailable,
                "服务响应异常，请稍后重试。",
                err.to_string(),
            ),
            ProviderError::InvalidUrl => {
                ClassifiedChatError::new(C::Unknown, "请求地址无效，请检查配置。", err.to_string())
            }
        }
    }

    fn classify_api(status_code: u16, message: &str) -> ClassifiedChatError {
        use ChatErrorCategory as C;

        let technical = redacted(message);
        match status_code {
            408 => return ClassifiedChatError::new(C::Timeout, TIMEOUT_MESSAGE, technical),
            429 => {
                return ClassifiedChatError::new(C::RateLimited, "请求过于频繁，已触发限流。", technical)
            }
            500..=599 => {
                return ClassifiedChatError::new(
                    C::ServerUnavailable,
                    "服务暂时不可用，请稍后重试。",
                    technical,
                )
            }
            _ => {}
        }

        let lower = message.to_lowercase();
        if ["context", "maximum context", "max tokens"]
            .iter()
            .any(|kw| lower.contains(kw))
        {
            return ClassifiedChatError::new(
                C::ContextTooLong,
                "上下文过长，请尝试减少历史消息或降低最大 Token。",
                technical,
            );
        }

        ClassifiedChatError::new(
            C::Unknown,
            format!("OpenRouter 请求失败：{technical}"),
            technical,
        )
    }

    fn classify_transport(err: &TransportError) -> ClassifiedChatError {
        use ChatErrorCategory as C;

        let technical = redacted(&err.message);
        match err.kind {
            TransportErrorKind::TimedOut => {
                ClassifiedChatError::new(C::Timeout, TIMEOUT_MESSAGE, technical)
            }
            TransportErrorKind::NotConnectedToInternet
            | TransportErrorKind::NetworkConnectionLost
            | TransportErrorKind::CannotConnectToHost
            | TransportErrorKind::CannotFindHost => {
                ClassifiedChatError::new(C::Network, NETWORK_MESSAGE, technical)
            }
            TransportErrorKind::Other => {
                ClassifiedChatError::new(C::Unknown, technical.clone(), technical)
            }
        }
    }

    fn classify_description(description: &str) -> ClassifiedChatError {
        use ChatErrorCategory as C;

        let technical = redacted(description);
        let lower = description.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            return ClassifiedChatError::new(C::Timeout, TIMEOUT_MESSAGE, technical);
        }
        if lower.contains("network") || lower.contains("internet") {
            return ClassifiedChatError::new(C::Network, NETWORK_MESSAGE, technical);
        }
        ClassifiedChatError::new(C::Unknown, technical.clone(), technical)
    }
}

fn redacted(text: &str) -> String {
    sanitizer::redact(text).into_owned()
}

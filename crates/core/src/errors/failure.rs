//! 传输调用失败
//!
//! 传输层与服务商客户端把失败统一包装为 [`ChatFailure`]，
//! 由编排器在调用边界交给 [`super::ErrorClassifier`] 分类一次。

use thiserror::Error;

/// 服务商返回的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("OpenRouter API Key 未配置")]
    MissingApiKey,

    #[error("{message}")]
    InsufficientCredits { message: String },

    #[error("{message}")]
    InvalidModelId { model: String, message: String },

    #[error("{message}")]
    ModelNotFound { model: String, message: String },

    #[error("{message}")]
    ModelNotSupportMultimodal { model: String, message: String },

    #[error("OpenRouter API 错误 (状态码: {status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("OpenRouter 返回了无效响应")]
    InvalidResponse,

    #[error("无效的 OpenRouter URL")]
    InvalidUrl,
}

/// 网络层错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    TimedOut,
    NotConnectedToInternet,
    NetworkConnectionLost,
    CannotConnectToHost,
    CannotFindHost,
    Other,
}

/// 网络层错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// 单次发送失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatFailure {
    #[error("请求已取消")]
    Cancelled,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Other(String),
}

impl ChatFailure {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Provider(ProviderError::Api {
            status_code,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let err = ChatFailure::api(500, "boom");
        assert_eq!(err.to_string(), "OpenRouter API 错误 (状态码: 500): boom");

        let err: ChatFailure =
            TransportError::new(TransportErrorKind::TimedOut, "request timed out").into();
        assert_eq!(err.to_string(), "request timed out");

        let err = ChatFailure::Provider(ProviderError::ModelNotFound {
            model: "x/y".to_string(),
            message: "模型不存在".to_string(),
        });
        assert_eq!(err.to_string(), "模型不存在");
    }
}

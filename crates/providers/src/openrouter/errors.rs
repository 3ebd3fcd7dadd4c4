//! HTTP 状态与网络错误映射

use easyai_core::{ChatFailure, ProviderError, TransportError, TransportErrorKind};

use super::wire::extract_error_message;

/// 把非 2xx 响应映射为失败
pub fn map_status_error(status: u16, body: &str, model: &str, max_tokens: u32) -> ChatFailure {
    let message = extract_error_message(body);
    let lower = body.to_lowercase();

    let provider_error = match status {
        401 => ProviderError::MissingApiKey,
        402 => ProviderError::InsufficientCredits {
            message: format!(
                "账户余额不足。\n\n错误详情：{message}\n\n解决方案：\n\
                 1. 访问 https://openrouter.ai/settings/credits 充值\n\
                 2. 切换到免费模型\n\
                 3. 在设置中减少 max_tokens 参数（当前设置为 {max_tokens}）"
            ),
        },
        400 if lower.contains("not a valid model id") || lower.contains("invalid model") => {
            ProviderError::InvalidModelId {
                model: model.to_string(),
                message: format!(
                    "模型ID无效：'{model}'\n\n可能的原因：模型ID格式不正确，或模型已下架、改名。\n\
                     请打开模型选择器，从列表中选择可用模型。"
                ),
            }
        }
        404 if lower.contains("no endpoints found that support") => {
            ProviderError::ModelNotSupportMultimodal {
                model: model.to_string(),
                message: "当前模型不支持图片输入。请切换到支持多模态的模型。".to_string(),
            }
        }
        404 if lower.contains("no endpoints found") => ProviderError::ModelNotFound {
            model: model.to_string(),
            message: format!(
                "模型 '{model}' 在 OpenRouter 上不可用。\n\n建议切换到其他可用模型，或从模型列表中选择。"
            ),
        },
        _ => ProviderError::Api {
            status_code: status,
            message,
        },
    };
    ChatFailure::Provider(provider_error)
}

/// 把 reqwest 错误映射为网络层失败
pub fn map_reqwest_error(err: &reqwest::Error) -> ChatFailure {
    let message = err.to_string();
    let lower = message.to_lowercase();

    let kind = if err.is_timeout() {
        TransportErrorKind::TimedOut
    } else if err.is_connect() {
        if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
            TransportErrorKind::CannotFindHost
        } else {
            TransportErrorKind::CannotConnectToHost
        }
    } else if err.is_body() || err.is_request() {
        TransportErrorKind::NetworkConnectionLost
    } else {
        TransportErrorKind::Other
    };

    ChatFailure::Transport(TransportError::new(kind, message))
}

/// 流式读取期间超过空闲时长
pub fn idle_timeout_error(secs: u64) -> ChatFailure {
    ChatFailure::Transport(TransportError::new(
        TransportErrorKind::TimedOut,
        format!("stream idle for {secs}s, request timed out"),
    ))
}

//! OpenRouter 请求/响应结构
//!
//! 兼容 OpenAI Chat Completions 格式。带附件的消息使用内容分段数组：
//! 先文本（非空时），后逐个附件，附件以 data URL 内联。

use easyai_core::{CompletionRequest, MediaContent, MediaType, Message, TokenUsage};
use serde::{Deserialize, Serialize};

// ============================================================================
// 请求
// ============================================================================

/// 补全请求体
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionBody {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    /// 服务端降级备选
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

impl ChatCompletionBody {
    pub fn from_request(request: &CompletionRequest, stream: bool) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            stream,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            models: request.fallback_models.clone(),
        }
    }
}

/// 单条消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: WireContent,
}

impl WireMessage {
    pub fn from_message(message: &Message) -> Self {
        let content = if message.has_media() {
            let mut parts = Vec::with_capacity(message.media_contents.len() + 1);
            if !message.content.is_empty() {
                parts.push(ContentPart::text(&message.content));
            }
            parts.extend(message.media_contents.iter().map(ContentPart::media));
            WireContent::Parts(parts)
        } else {
            WireContent::Text(message.content.clone())
        };

        Self {
            role: message.role.as_str(),
            content,
        }
    }
}

/// 消息内容：纯文本或分段数组
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// 内容分段
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: MediaUrl },
    VideoUrl { video_url: MediaUrl },
    AudioUrl { audio_url: MediaUrl },
    DocumentUrl { document_url: MediaUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: &str) -> Self {
        ContentPart::Text {
            text: text.to_string(),
        }
    }

    pub fn media(media: &MediaContent) -> Self {
        let url = MediaUrl {
            url: media.data_url(),
        };
        match media.media_type {
            MediaType::Image => ContentPart::ImageUrl { image_url: url },
            MediaType::Video => ContentPart::VideoUrl { video_url: url },
            MediaType::Audio => ContentPart::AudioUrl { audio_url: url },
            MediaType::Pdf | MediaType::Document => ContentPart::DocumentUrl { document_url: url },
        }
    }
}

// ============================================================================
// 响应
// ============================================================================

/// 非流式响应
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// 流式分块
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
    #[serde(default)]
    pub error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

/// 用量
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WireUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl From<WireUsage> for TokenUsage {
    fn from(usage: WireUsage) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage
                .total_tokens
                .unwrap_or(usage.prompt_tokens + usage.completion_tokens),
        }
    }
}

/// 错误体 `{"error": {"message", "code"}}`
#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl WireError {
    /// 数字错误码
    pub fn status_code(&self) -> Option<u16> {
        self.code
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: WireError,
}

/// 从错误响应体中取出 `error.message`，取不到时返回原文
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

// ============================================================================
// 模型列表
// ============================================================================

/// `/models` 响应
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

/// 单个模型条目
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub pricing: Option<EntryPricing>,
    #[serde(default)]
    pub architecture: Option<EntryArchitecture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryPricing {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub completion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryArchitecture {
    #[serde(default)]
    pub input_modalities: Vec<String>,
    #[serde(default)]
    pub output_modalities: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message_is_plain_string() {
        let wire = WireMessage::from_message(&Message::user("你好"));
        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            json!({"role": "user", "content": "你好"})
        );
    }

    #[test]
    fn test_media_message_uses_parts() {
        let message = Message::user("看看这张图").with_media(vec![
            MediaContent::image(vec![1, 2, 3], "image/png"),
            MediaContent::new(MediaType::Pdf, vec![4], "application/pdf"),
        ]);
        let value = serde_json::to_value(WireMessage::from_message(&message)).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "看看这张图"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AQID"}},
                    {"type": "document_url", "document_url": {"url": "data:application/pdf;base64,BA=="}}
                ]
            })
        );
    }

    #[test]
    fn test_media_without_text_skips_text_part() {
        let message = Message::user("")
            .with_media(vec![MediaContent::new(MediaType::Audio, vec![0], "audio/wav")]);
        let value = serde_json::to_value(WireMessage::from_message(&message)).unwrap();
        let parts = value["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["type"], "audio_url");
    }

    #[test]
    fn test_body_omits_empty_fallback_list() {
        let request = CompletionRequest::new(vec![Message::user("hi")], "a/b").with_max_tokens(64);
        let value = serde_json::to_value(ChatCompletionBody::from_request(&request, true)).unwrap();
        assert_eq!(value["model"], "a/b");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 64);
        assert!(value.get("models").is_none());

        let request = request.with_fallback_models(vec!["c/d".to_string()]);
        let value = serde_json::to_value(ChatCompletionBody::from_request(&request, false)).unwrap();
        assert_eq!(value["models"], json!(["c/d"]));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"Rate limit exceeded","code":429}}"#),
            "Rate limit exceeded"
        );
        assert_eq!(extract_error_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn test_usage_total_fallback() {
        let usage: WireUsage =
            serde_json::from_str(r#"{"prompt_tokens": 10, "completion_tokens": 5}"#).unwrap();
        assert_eq!(TokenUsage::from(usage).total_tokens, 15);
    }
}

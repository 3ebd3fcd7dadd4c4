//! OpenRouter 客户端
//!
//! 实现 [`ChatTransport`] 与 [`ModelSource`]。每次请求从 [`ConfigHandle`] 读取
//! 地址、密钥与请求头，设置修改后无需重建客户端。

pub mod errors;
pub mod models;
pub mod sse;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Url};

use easyai_config::{ChatConfig, ConfigHandle};
use easyai_core::{
    AIModel, ChatFailure, ChatTransport, Completion, CompletionRequest, ProviderError,
    TokenStream, TransportError, TransportErrorKind,
};

use crate::catalog::ModelSource;
use errors::{map_reqwest_error, map_status_error};
use wire::{ChatCompletionBody, ChatCompletionResponse, ModelsResponse};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MODELS_TIMEOUT_SECS: u64 = 30;

/// OpenRouter 客户端
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    config: ConfigHandle,
}

impl OpenRouterClient {
    /// 创建客户端
    pub fn new(config: ConfigHandle) -> Result<Self, ChatFailure> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ChatFailure::other(format!("创建 HTTP 客户端失败: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(config: &ChatConfig, path: &str) -> Result<Url, ChatFailure> {
        let raw = format!("{}/{}", config.api_base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|_| ProviderError::InvalidUrl.into())
    }

    fn authorized(config: &ChatConfig, builder: RequestBuilder) -> Result<RequestBuilder, ChatFailure> {
        if !config.has_api_key() {
            return Err(ProviderError::MissingApiKey.into());
        }
        Ok(builder
            .header(header::AUTHORIZATION, format!("Bearer {}", config.api_key.expose()))
            .header(header::CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", config.app_referer.as_str())
            .header("X-Title", config.app_title.as_str()))
    }

    /// 发出补全请求，非 2xx 映射为失败
    async fn post_completion(
        &self,
        config: &ChatConfig,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ChatFailure> {
        let url = Self::endpoint(config, "chat/completions")?;
        let body = ChatCompletionBody::from_request(request, stream);

        tracing::info!(
            "[OpenRouter] 发送请求: model={}, messages={}, stream={}, media={}, fallback_models={}",
            request.model,
            request.messages.len(),
            stream,
            request.has_media(),
            request.fallback_models.len()
        );

        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let mut builder = self.client.post(url).json(&body);
        if stream {
            builder = builder.header(header::ACCEPT, "text/event-stream");
        } else {
            builder = builder.timeout(timeout);
        }

        // 流式请求的正文由空闲超时约束，这里只限制等待响应头的时间
        let send = Self::authorized(config, builder)?.send();
        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| {
                tracing::warn!("[OpenRouter] 等待响应头超时: {}s", timeout.as_secs());
                ChatFailure::from(TransportError::new(
                    TransportErrorKind::TimedOut,
                    "等待响应超时",
                ))
            })?
            .map_err(|e| map_reqwest_error(&e))?;

        let status = response.status();
        tracing::debug!("[OpenRouter] 响应状态: {}", status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "无法读取响应".to_string());
        tracing::warn!(
            "[OpenRouter] API 错误: status={}, body={}",
            status,
            easyai_core::sanitizer::redact(&body)
        );
        Err(map_status_error(
            status.as_u16(),
            &body,
            &request.model,
            request.max_tokens,
        ))
    }
}

#[async_trait]
impl ChatTransport for OpenRouterClient {
    async fn send_once(&self, request: CompletionRequest) -> Result<Completion, ChatFailure> {
        let config = self.config.snapshot();
        let response = self.post_completion(&config, &request, false).await?;

        let body = response.text().await.map_err(|e| map_reqwest_error(&e))?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("[OpenRouter] 解析响应失败: {}", e);
            ChatFailure::from(ProviderError::InvalidResponse)
        })?;

        if let Some(error) = parsed.error {
            let status = error.status_code().unwrap_or(500);
            return Err(ChatFailure::api(
                status,
                error.message.unwrap_or_else(|| body.clone()),
            ));
        }

        let text = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::InvalidResponse)?
            .message
            .content
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage: parsed.usage.map(Into::into),
        })
    }

    async fn stream_tokens(&self, request: CompletionRequest) -> Result<TokenStream, ChatFailure> {
        let config = self.config.snapshot();
        let response = self.post_completion(&config, &request, true).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| map_reqwest_error(&e)));
        Ok(sse::decode_stream(
            bytes,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        ))
    }
}

#[async_trait]
impl ModelSource for OpenRouterClient {
    async fn list_models(&self) -> Result<Vec<AIModel>, ChatFailure> {
        let config = self.config.snapshot();
        let url = Self::endpoint(&config, "models")?;

        let mut builder = self
            .client
            .get(url)
            .timeout(Duration::from_secs(MODELS_TIMEOUT_SECS));
        // 模型列表不强制要求密钥
        if config.has_api_key() {
            builder = Self::authorized(&config, builder)?;
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "无法读取响应".to_string());
            return Err(ChatFailure::api(
                status.as_u16(),
                wire::extract_error_message(&body),
            ));
        }

        let body = response.text().await.map_err(|e| map_reqwest_error(&e))?;
        let parsed: ModelsResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("[OpenRouter] 解析模型列表失败: {}", e);
            ChatFailure::from(ProviderError::InvalidResponse)
        })?;

        let models: Vec<AIModel> = parsed.data.into_iter().map(models::model_from_entry).collect();
        tracing::info!("[OpenRouter] 获取到 {} 个模型", models.len());
        Ok(models)
    }
}

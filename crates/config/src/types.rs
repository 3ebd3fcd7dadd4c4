//! 配置结构与默认值

use easyai_core::special_response::DEFAULT_SPECIAL_RESPONSE;
use easyai_core::{BudgetMode, ContextStrategy, FallbackSettings, ModelFilter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 附件轮次的 max_tokens 上限
const MEDIA_MAX_TOKENS_CAP: u32 = 4096;

/// API Key
///
/// `Debug` 输出不包含明文。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(***)")
        }
    }
}

/// 智能路由配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// 是否在发送前按意图切换模型
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 预算模式，同时用于降级排序
    #[serde(default)]
    pub budget_mode: BudgetMode,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            budget_mode: BudgetMode::default(),
        }
    }
}

/// 身份类问题拦截配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialResponseSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_special_text")]
    pub text: String,
}

impl Default for SpecialResponseSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            text: default_special_text(),
        }
    }
}

/// 对话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// OpenAI 兼容接口地址
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: ApiKey,
    /// HTTP-Referer 头
    #[serde(default = "default_app_referer")]
    pub app_referer: String,
    /// X-Title 头
    #[serde(default = "default_app_title")]
    pub app_title: String,
    /// 是否流式输出
    #[serde(default = "default_true")]
    pub enable_stream: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub context_strategy: ContextStrategy,
    /// 发送给模型的最大上下文消息条数
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
    /// 本地保留的最大消息条数
    #[serde(default = "default_max_stored_messages")]
    pub max_stored_messages: usize,
    /// 请求超时（秒）
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 模型列表缓存有效期（秒）
    #[serde(default = "default_model_cache_ttl_secs")]
    pub model_cache_ttl_secs: u64,
    #[serde(default)]
    pub model_filter: ModelFilter,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub fallback: FallbackSettings,
    #[serde(default)]
    pub special_response: SpecialResponseSettings,
    /// 日志级别（tracing EnvFilter 指令）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}
fn default_special_text() -> String {
    DEFAULT_SPECIAL_RESPONSE.to_string()
}
fn default_api_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_app_referer() -> String {
    "https://easyai.app".to_string()
}
fn default_app_title() -> String {
    "easyAI".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_context_messages() -> usize {
    20
}
fn default_max_stored_messages() -> usize {
    200
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_model_cache_ttl_secs() -> u64 {
    60 * 60 * 12
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_key: ApiKey::default(),
            app_referer: default_app_referer(),
            app_title: default_app_title(),
            enable_stream: true,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            context_strategy: ContextStrategy::default(),
            max_context_messages: default_max_context_messages(),
            max_stored_messages: default_max_stored_messages(),
            request_timeout_secs: default_request_timeout_secs(),
            model_cache_ttl_secs: default_model_cache_ttl_secs(),
            model_filter: ModelFilter::default(),
            routing: RoutingSettings::default(),
            fallback: FallbackSettings::default(),
            special_response: SpecialResponseSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl ChatConfig {
    /// 是否已配置 API Key
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// 本轮的 max_tokens，带附件时翻倍并封顶 4096
    pub fn max_tokens_for(&self, has_media: bool) -> u32 {
        if has_media {
            self.max_tokens.saturating_mul(2).min(MEDIA_MAX_TOKENS_CAP)
        } else {
            self.max_tokens
        }
    }

    /// 校验并修正越界取值
    pub fn normalized(mut self) -> Self {
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
        if self.max_context_messages == 0 {
            self.max_context_messages = 1;
        }
        if self.max_stored_messages < self.max_context_messages {
            self.max_stored_messages = self.max_context_messages;
        }
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self
    }
}

//! 模型目录条目

use serde::{Deserialize, Serialize};

/// 模型服务商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    OpenRouter,
}

/// 单价信息（服务端以十进制字符串给出，单位为美元/token）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ModelPricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
}

impl ModelPricing {
    pub fn new(prompt: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            completion: Some(completion.into()),
        }
    }

    pub fn prompt_rate(&self) -> Option<f64> {
        self.prompt.as_deref().and_then(parse_price)
    }

    pub fn completion_rate(&self) -> Option<f64> {
        self.completion.as_deref().and_then(parse_price)
    }
}

/// 解析价格字符串
///
/// 去除首尾空白、`$` 与千分位逗号；空串或无法解析返回 `None`。
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 可用模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub provider: ModelProvider,
    /// 服务商侧真实模型 ID，如 `deepseek/deepseek-chat`
    pub api_model: String,
    #[serde(default)]
    pub supports_multimodal: bool,
    #[serde(default)]
    pub input_modalities: Vec<String>,
    #[serde(default)]
    pub output_modalities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
}

impl AIModel {
    pub fn new(id: impl Into<String>, name: impl Into<String>, api_model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            provider: ModelProvider::default(),
            api_model: api_model.into(),
            supports_multimodal: false,
            input_modalities: vec!["text".to_string()],
            output_modalities: vec!["text".to_string()],
            context_length: None,
            pricing: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 设置输入模态，含 `image` 时视为支持多模态
    pub fn with_input_modalities(mut self, modalities: Vec<String>) -> Self {
        self.supports_multimodal = modalities.iter().any(|m| m == "image");
        self.input_modalities = modalities;
        self
    }

    pub fn with_output_modalities(mut self, modalities: Vec<String>) -> Self {
        self.output_modalities = modalities;
        self
    }

    pub fn with_multimodal(mut self, supports: bool) -> Self {
        self.supports_multimodal = supports;
        self
    }

    pub fn with_context_length(mut self, context_length: u64) -> Self {
        self.context_length = Some(context_length);
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// 是否免费
    ///
    /// 两项单价都能解析且都为 0 才算免费，任一无法解析视为收费。
    pub fn is_free(&self) -> bool {
        let Some(pricing) = &self.pricing else {
            return false;
        };
        matches!(
            (pricing.prompt_rate(), pricing.completion_rate()),
            (Some(prompt), Some(completion)) if prompt == 0.0 && completion == 0.0
        )
    }

    pub fn prompt_rate(&self) -> Option<f64> {
        self.pricing.as_ref().and_then(ModelPricing::prompt_rate)
    }

    pub fn completion_rate(&self) -> Option<f64> {
        self.pricing.as_ref().and_then(ModelPricing::completion_rate)
    }

    /// 上下文长度，未知为 0
    pub fn context_len(&self) -> u64 {
        self.context_length.unwrap_or(0)
    }

    /// 名称与 API 模型 ID 拼接后的小写文本，用于名称匹配
    pub fn search_text(&self) -> String {
        format!("{} {}", self.name, self.api_model).to_lowercase()
    }
}

//! `/models` 条目到本地模型的映射

use easyai_core::{AIModel, ModelPricing, ModelProvider};

use super::wire::ModelEntry;

/// 本地模型 ID 前缀
pub const LOCAL_ID_PREFIX: &str = "openrouter-";

const DEFAULT_DESCRIPTION: &str = "OpenRouter 模型";

/// 服务商模型 ID 转本地 ID：`deepseek/deepseek-chat` → `openrouter-deepseek-deepseek-chat`
pub fn local_model_id(api_model: &str) -> String {
    format!("{LOCAL_ID_PREFIX}{}", api_model.replace('/', "-"))
}

/// 映射单个条目
pub fn model_from_entry(entry: ModelEntry) -> AIModel {
    let name = entry
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| entry.id.clone());
    let description = entry
        .description
        .filter(|desc| !desc.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    let mut model = AIModel::new(local_model_id(&entry.id), name, entry.id)
        .with_description(description);
    model.provider = ModelProvider::OpenRouter;

    if let Some(architecture) = entry.architecture {
        model = model
            .with_input_modalities(architecture.input_modalities)
            .with_output_modalities(architecture.output_modalities);
    }
    if let Some(context_length) = entry.context_length {
        model = model.with_context_length(context_length);
    }
    if let Some(pricing) = entry.pricing {
        model = model.with_pricing(ModelPricing {
            prompt: pricing.prompt,
            completion: pricing.completion,
        });
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openrouter::wire::ModelsResponse;

    #[test]
    fn test_map_models_payload() {
        let body = r#"{
            "data": [
                {
                    "id": "google/gemini-2.0-flash-exp:free",
                    "name": "Google: Gemini 2.0 Flash (free)",
                    "context_length": 1048576,
                    "pricing": {"prompt": "0", "completion": "0"},
                    "architecture": {
                        "input_modalities": ["text", "image"],
                        "output_modalities": ["text"]
                    }
                },
                {
                    "id": "deepseek/deepseek-chat",
                    "name": "",
                    "description": "",
                    "pricing": {"prompt": "0.00000014", "completion": "0.00000028"}
                }
            ]
        }"#;
        let response: ModelsResponse = serde_json::from_str(body).unwrap();
        let models: Vec<AIModel> = response.data.into_iter().map(model_from_entry).collect();

        assert_eq!(models[0].id, "openrouter-google-gemini-2.0-flash-exp:free");
        assert_eq!(models[0].api_model, "google/gemini-2.0-flash-exp:free");
        assert!(models[0].supports_multimodal);
        assert!(models[0].is_free());
        assert_eq!(models[0].context_length, Some(1_048_576));

        assert_eq!(models[1].name, "deepseek/deepseek-chat");
        assert_eq!(models[1].description, "OpenRouter 模型");
        assert!(!models[1].supports_multimodal);
        assert!(!models[1].is_free());
    }
}

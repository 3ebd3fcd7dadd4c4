//! Token 与费用估算
//!
//! 服务端没有返回用量时按字符数粗略估算，结果标记为估算值。

use crate::models::{AIModel, MediaType, Message, MessageMetrics};
use crate::transport::TokenUsage;

/// 每条消息的角色开销（字符）
const ROLE_OVERHEAD_CHARS: usize = 8;
const IMAGE_OVERHEAD_CHARS: usize = 180;
const OTHER_MEDIA_OVERHEAD_CHARS: usize = 120;
const CHARS_PER_TOKEN: f64 = 3.6;

/// 按字符数估算 token
pub fn estimate_tokens_by_chars(chars: usize) -> u64 {
    if chars == 0 {
        return 0;
    }
    (chars as f64 / CHARS_PER_TOKEN).ceil() as u64
}

/// 估算请求 token
pub fn estimate_prompt_tokens(messages: &[Message]) -> u64 {
    let chars: usize = messages
        .iter()
        .map(|message| {
            let media: usize = message
                .media_contents
                .iter()
                .map(|m| match m.media_type {
                    MediaType::Image => IMAGE_OVERHEAD_CHARS,
                    _ => OTHER_MEDIA_OVERHEAD_CHARS,
                })
                .sum();
            message.char_count() + ROLE_OVERHEAD_CHARS + media
        })
        .sum();
    estimate_tokens_by_chars(chars)
}

/// 估算文本 token
pub fn estimate_text_tokens(text: &str) -> u64 {
    estimate_tokens_by_chars(text.chars().count())
}

/// 估算费用（美元），两项单价都不大于 0 时返回 `None`
pub fn estimate_cost_usd(model: &AIModel, prompt_tokens: u64, completion_tokens: u64) -> Option<f64> {
    let prompt_rate = model.prompt_rate().unwrap_or(0.0);
    let completion_rate = model.completion_rate().unwrap_or(0.0);
    if prompt_rate <= 0.0 && completion_rate <= 0.0 {
        return None;
    }
    Some(prompt_tokens as f64 * prompt_rate + completion_tokens as f64 * completion_rate)
}

/// 生成回复指标，服务端用量优先
pub fn make_metrics(
    request_messages: &[Message],
    response_text: &str,
    model: &AIModel,
    latency_ms: u64,
    usage: Option<&TokenUsage>,
) -> MessageMetrics {
    let (prompt_tokens, completion_tokens, total_tokens) = match usage {
        Some(usage) => (usage.prompt_tokens, usage.completion_tokens, usage.total_tokens),
        None => {
            let prompt = estimate_prompt_tokens(request_messages);
            let completion = estimate_text_tokens(response_text);
            (prompt, completion, prompt + completion)
        }
    };

    MessageMetrics {
        prompt_tokens,
        completion_tokens,
        total_tokens,
        latency_ms,
        estimated_cost_usd: estimate_cost_usd(model, prompt_tokens, completion_tokens),
        is_estimated: usage.is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaContent, ModelPricing};

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens_by_chars(0), 0);
        assert_eq!(estimate_tokens_by_chars(1), 1);
        assert_eq!(estimate_tokens_by_chars(36), 10);
        assert_eq!(estimate_tokens_by_chars(37), 11);
    }

    #[test]
    fn test_prompt_overheads() {
        let messages = vec![
            Message::user("12345678901234567890"),
            Message::user("").with_media(vec![MediaContent::image(vec![1], "image/png")]),
        ];
        // (20 + 8) + (0 + 8 + 180) = 216 → 60
        assert_eq!(estimate_prompt_tokens(&messages), 60);
    }

    #[test]
    fn test_cost_requires_positive_rate() {
        let free = AIModel::new("f", "F", "f/f").with_pricing(ModelPricing::new("0", "0"));
        assert!(estimate_cost_usd(&free, 100, 100).is_none());

        let paid = AIModel::new("p", "P", "p/p").with_pricing(ModelPricing::new("0.001", "0.002"));
        let cost = estimate_cost_usd(&paid, 100, 50).unwrap();
        assert!((cost - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_usage_wins_over_estimate() {
        let model = AIModel::new("m", "M", "m/m");
        let usage = TokenUsage {
            prompt_tokens: 11,
            completion_tokens: 22,
            total_tokens: 33,
        };
        let metrics = make_metrics(&[Message::user("hello")], "world", &model, 420, Some(&usage));
        assert_eq!(metrics.total_tokens, 33);
        assert!(!metrics.is_estimated);

        let estimated = make_metrics(&[Message::user("hello")], "world", &model, 420, None);
        assert!(estimated.is_estimated);
        // (5 + 8) / 3.6 → 4, 5 / 3.6 → 2
        assert_eq!(estimated.prompt_tokens, 4);
        assert_eq!(estimated.completion_tokens, 2);
        assert_eq!(estimated.total_tokens, 6);
        assert!(estimated.estimated_cost_usd.is_none());
    }
}

//! 状态行文案

use crate::models::MessageMetrics;

/// 状态片段分隔符
pub const STATUS_SEPARATOR: &str = " · ";

/// 拼接非空片段
pub fn merge_status<I, S>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let parts: Vec<String> = parts
        .into_iter()
        .flatten()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(STATUS_SEPARATOR))
    }
}

/// 行状态：停止提示 → 运行时状态 → 指标
pub fn compose_status_text(
    notice_text: Option<&str>,
    runtime_status: Option<&str>,
    metrics: Option<&MessageMetrics>,
) -> Option<String> {
    let metrics_text = metrics.and_then(metrics_status);
    merge_status([notice_text, runtime_status, metrics_text.as_deref()])
}

/// 指标摘要，例如 `1,234 tok · 850ms · ≈$0.0012`
pub fn metrics_status(metrics: &MessageMetrics) -> Option<String> {
    let prefix = if metrics.is_estimated { "≈" } else { "" };
    let cost = metrics
        .estimated_cost_usd
        .map(|usd| format!("{prefix}${}", format_cost(usd)));

    merge_status([
        Some(format!("{} tok", format_integer(metrics.total_tokens))),
        Some(format_latency(metrics.latency_ms)),
        cost,
    ])
}

/// 千分位
pub fn format_integer(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_latency(latency_ms: u64) -> String {
    if latency_ms < 1000 {
        format!("{latency_ms}ms")
    } else {
        format!("{:.2}s", latency_ms as f64 / 1000.0)
    }
}

pub fn format_cost(usd: f64) -> String {
    if usd < 0.0001 {
        "<0.0001".to_string()
    } else {
        format!("{usd:.4}")
    }
}

/// 降级提示
pub fn fallback_status_text(model_name: &str, attempt: u32) -> String {
    format!("已切换到 {model_name}（重试 {attempt} 次）")
}

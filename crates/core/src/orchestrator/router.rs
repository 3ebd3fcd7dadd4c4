//! 模型路由
//!
//! 发送前按任务意图与预算模式给候选模型打分（加性，越高越好），
//! 只有存在比当前模型更合适的候选时才给出推荐。

use serde::{Deserialize, Serialize};

use super::budget::{total_unit_price, BudgetMode};
use crate::intent::{TaskIntent, TaskType};
use crate::models::AIModel;

/// 估算上下文超过该字符数时，更看重大上下文窗口
const LARGE_CONTEXT_CHARS: usize = 12_000;

/// 路由建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub model: AIModel,
    pub reason: String,
}

/// 任务类型对应的名称关键词与加分
const TASK_NAME_BONUS: &[(TaskType, &[&str], f64)] = &[
    (TaskType::Coding, &["code", "coder", "deepseek", "qwen"], 18.0),
    (TaskType::Translation, &["gpt", "claude", "gemini"], 10.0),
    (TaskType::Summarization, &["flash", "haiku"], 8.0),
    (TaskType::Writing, &["claude", "gpt"], 10.0),
    (TaskType::Vision, &["vision", "vl", "gemini"], 20.0),
];

/// 质量优先模式下的名称档位
const QUALITY_TIERS: &[(&[&str], f64)] = &[
    (&["gpt-4", "o3", "claude-3", "claude 3"], 22.0),
    (&["gemini", "sonnet"], 16.0),
];
const QUALITY_BASE_BOOST: f64 = 8.0;

/// 模型路由器
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRouter;

impl ModelRouter {
    pub fn new() -> Self {
        Self
    }

    /// 推荐模型
    ///
    /// 需要视觉能力时只考虑多模态模型；最高分候选就是当前模型时返回 `None`。
    pub fn recommend(
        &self,
        current: Option<&AIModel>,
        catalog: &[AIModel],
        intent: &TaskIntent,
        budget_mode: BudgetMode,
    ) -> Option<RoutingDecision> {
        let mut best: Option<(&AIModel, f64)> = None;
        for model in catalog
            .iter()
            .filter(|m| !intent.requires_vision || m.supports_multimodal)
        {
            let score = Self::score(model, intent, budget_mode);
            // 同分时保留先出现的候选
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((model, score));
            }
        }

        let (model, score) = best?;
        if current.is_some_and(|c| c.id == model.id) {
            tracing::debug!("[ROUTE] 当前模型已是最优: {}", model.id);
            return None;
        }

        tracing::debug!(
            "[ROUTE] 推荐模型 {} (score={:.2}, task={}, budget={})",
            model.id,
            score,
            intent.task_type.as_str(),
            budget_mode.title()
        );

        Some(RoutingDecision {
            model: model.clone(),
            reason: format!(
                "智能路由：{} · {}",
                intent.task_type.as_str(),
                budget_mode.title()
            ),
        })
    }

    /// 计算候选得分
    pub fn score(model: &AIModel, intent: &TaskIntent, budget_mode: BudgetMode) -> f64 {
        let mut score = 0.0;

        // 模态
        if model.supports_multimodal {
            score += if intent.requires_vision { 35.0 } else { 4.0 };
        }

        // 上下文窗口
        if let Some(ctx_len) = model.context_length {
            let divisor = if intent.estimated_context_chars > LARGE_CONTEXT_CHARS {
                4_000.0
            } else {
                12_000.0
            };
            score += ctx_len as f64 / divisor;
        }

        // 名称匹配
        let name = model.search_text();
        if let Some((_, keywords, bonus)) = TASK_NAME_BONUS
            .iter()
            .find(|(task, _, _)| *task == intent.task_type)
        {
            if keywords.iter().any(|kw| name.contains(kw)) {
                score += bonus;
            }
        }

        // 预算
        let total_price = total_unit_price(model);
        match budget_mode {
            BudgetMode::FreeFirst => {
                score += if model.is_free() {
                    30.0
                } else {
                    (12.0 - total_price * 100_000.0).max(0.0)
                };
            }
            BudgetMode::CostEffective => {
                score += (18.0 - total_price * 70_000.0).max(0.0);
                if let Some(ctx_len) = model.context_length {
                    score += ctx_len as f64 / 25_000.0;
                }
            }
            BudgetMode::QualityFirst => {
                score += QUALITY_TIERS
                    .iter()
                    .find(|(patterns, _)| patterns.iter().any(|p| name.contains(p)))
                    .map(|(_, boost)| *boost)
                    .unwrap_or(QUALITY_BASE_BOOST);
                if !model.is_free() {
                    score += 6.0;
                }
            }
        }

        score
    }
}

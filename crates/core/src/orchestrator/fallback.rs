//! 降级规划
//!
//! 发送失败后按预算模式给其余模型排序，返回第一个本轮尚未尝试过的候选。
//! 调用方负责在各次尝试之间累积已尝试集合，同一轮内同一模型不会被重试两次。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::budget::{compare_cost, BudgetMode};
use crate::errors::ChatErrorCategory;
use crate::models::AIModel;

/// 降级配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackSettings {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 单轮最多降级次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 随请求下发给服务端的备选模型数量
    #[serde(default = "default_native_depth")]
    pub native_depth: u32,
    #[serde(default = "default_true")]
    pub retry_on_rate_limited: bool,
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,
    #[serde(default = "default_true")]
    pub retry_on_server_unavailable: bool,
    #[serde(default = "default_true")]
    pub retry_on_network: bool,
}

fn default_true() -> bool {
    true
}
fn default_max_attempts() -> u32 {
    2
}
fn default_native_depth() -> u32 {
    2
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            native_depth: default_native_depth(),
            retry_on_rate_limited: true,
            retry_on_timeout: true,
            retry_on_server_unavailable: true,
            retry_on_network: true,
        }
    }
}

/// 降级规划器
#[derive(Debug, Clone, Default)]
pub struct FallbackPlanner {
    settings: FallbackSettings,
}

impl FallbackPlanner {
    pub fn new(settings: FallbackSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FallbackSettings {
        &self.settings
    }

    /// 有效的最大尝试次数，至少为 1
    pub fn max_attempts(&self) -> u32 {
        self.settings.max_attempts.max(1)
    }

    /// 该类别是否触发降级重试
    ///
    /// 只有限流、超时、服务不可用、网络异常可以重试，且各自受开关控制。
    pub fn should_retry_fallback(&self, category: ChatErrorCategory) -> bool {
        if !self.settings.enabled {
            return false;
        }
        match category {
            ChatErrorCategory::RateLimited => self.settings.retry_on_rate_limited,
            ChatErrorCategory::Timeout => self.settings.retry_on_timeout,
            ChatErrorCategory::ServerUnavailable => self.settings.retry_on_server_unavailable,
            ChatErrorCategory::Network => self.settings.retry_on_network,
            _ => false,
        }
    }

    /// 下一个降级候选
    #[allow(clippy::too_many_arguments)]
    pub fn next_candidate(
        &self,
        current: &AIModel,
        catalog: &[AIModel],
        attempt_index: u32,
        category: ChatErrorCategory,
        budget_mode: BudgetMode,
        tried_ids: &HashSet<String>,
        requires_multimodal: bool,
    ) -> Option<AIModel> {
        if !(category.is_retryable() || category.is_model_specific()) {
            return None;
        }
        if attempt_index >= self.max_attempts() {
            return None;
        }

        Self::ranked_candidates(current, catalog, budget_mode, requires_multimodal)
            .into_iter()
            .find(|m| !tried_ids.contains(&m.id))
            .cloned()
    }

    /// 排序后的候选列表（不含当前模型）
    pub fn ranked_candidates<'a>(
        current: &AIModel,
        catalog: &'a [AIModel],
        budget_mode: BudgetMode,
        requires_multimodal: bool,
    ) -> Vec<&'a AIModel> {
        let mut candidates: Vec<&AIModel> = catalog
            .iter()
            .filter(|m| m.id != current.id)
            .filter(|m| !requires_multimodal || m.supports_multimodal)
            .collect();

        match budget_mode {
            BudgetMode::FreeFirst => candidates.sort_by(|a, b| {
                b.is_free()
                    .cmp(&a.is_free())
                    .then_with(|| compare_cost(a, b))
            }),
            BudgetMode::CostEffective => candidates.sort_by(|a, b| compare_cost(a, b)),
            BudgetMode::QualityFirst => candidates.sort_by(|a, b| {
                quality_score(b)
                    .cmp(&quality_score(a))
                    .then_with(|| compare_cost(a, b))
            }),
        }
        candidates
    }

    /// 随请求下发的服务端备选模型
    ///
    /// 按服务不可用场景连续规划 `native_depth` 个候选，返回它们的 API 模型 ID。
    pub fn native_fallback_models(
        &self,
        current: &AIModel,
        catalog: &[AIModel],
        budget_mode: BudgetMode,
        requires_multimodal: bool,
    ) -> Vec<String> {
        let depth = self.settings.native_depth;
        if !self.settings.enabled || depth == 0 {
            return Vec::new();
        }

        let mut tried: HashSet<String> = HashSet::from([current.id.clone()]);
        let mut cursor = current.clone();
        let mut models = Vec::new();
        let mut attempt_index = 0;

        while attempt_index < depth {
            let Some(next) = self.next_candidate(
                &cursor,
                catalog,
                attempt_index,
                ChatErrorCategory::ServerUnavailable,
                budget_mode,
                &tried,
                requires_multimodal,
            ) else {
                break;
            };
            let api_model = next.api_model.trim();
            if !api_model.is_empty() {
                models.push(api_model.to_string());
            }
            tried.insert(next.id.clone());
            cursor = next;
            attempt_index += 1;
        }

        models
    }
}

/// 质量分：上下文档位 0-4，多模态 +1，收费 +1
fn quality_score(model: &AIModel) -> u32 {
    let ctx = model.context_len();
    let mut score = match ctx {
        c if c >= 1_000_000 => 4,
        c if c >= 200_000 => 3,
        c if c >= 64_000 => 2,
        c if c >= 16_000 => 1,
        _ => 0,
    };
    if model.supports_multimodal {
        score += 1;
    }
    if !model.is_free() {
        score += 1;
    }
    score
}

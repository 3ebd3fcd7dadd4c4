//! 单轮上下文
//!
//! 一轮对话内会变化的数据（当前模型、已尝试集合、降级与路由状态）都放在 [`TurnContext`]，
//! 沿调用链显式传递，不挂在编排器上。

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use easyai_config::ChatConfig;
use easyai_core::render::{fallback_status_text, merge_status};
use easyai_core::{
    AIModel, BudgetMode, ItemKind, RoutingDecision, RoutingMetadata, RoutingMode, TurnIdentity,
};

/// 轮次结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEndReason {
    /// 流正常结束
    Closed,
    /// 非流式请求完成
    NonStreamDone,
    /// 命中固定回复
    SpecialResponse,
    ModelNotReady,
    ModelNotSupportMultimodal,
    Error,
    Cancelled,
}

impl TurnEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnEndReason::Closed => "closed",
            TurnEndReason::NonStreamDone => "non_stream_done",
            TurnEndReason::SpecialResponse => "special_response",
            TurnEndReason::ModelNotReady => "model_not_ready",
            TurnEndReason::ModelNotSupportMultimodal => "model_not_support_multimodal",
            TurnEndReason::Error => "error",
            TurnEndReason::Cancelled => "cancelled",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TurnEndReason::Closed | TurnEndReason::NonStreamDone | TurnEndReason::SpecialResponse
        )
    }
}

/// 单轮上下文
#[derive(Debug)]
pub struct TurnContext {
    pub identity: TurnIdentity,
    /// 本轮开始时的配置快照
    pub config: ChatConfig,
    /// 当前尝试使用的模型
    pub model: AIModel,
    pub tried_ids: HashSet<String>,
    /// 已降级次数
    pub attempt_index: u32,
    pub fallback_status: Option<String>,
    pub routing_status: Option<String>,
    pub routing_metadata: Option<RoutingMetadata>,
    pub requires_multimodal: bool,
    pub started_at: Instant,
    pub cancel: CancellationToken,
}

impl TurnContext {
    pub fn new(
        identity: TurnIdentity,
        config: ChatConfig,
        model: AIModel,
        requires_multimodal: bool,
        cancel: CancellationToken,
    ) -> Self {
        let tried_ids = HashSet::from([model.id.clone()]);
        Self {
            identity,
            config,
            model,
            tried_ids,
            attempt_index: 0,
            fallback_status: None,
            routing_status: None,
            routing_metadata: None,
            requires_multimodal,
            started_at: Instant::now(),
            cancel,
        }
    }

    pub fn base_id(&self) -> &str {
        &self.identity.base_id
    }

    /// 当前尝试的流式条目 ID，首次为 `main`，之后为 `retry-{n}`
    pub fn stream_item_id(&self) -> String {
        self.identity
            .item_id(ItemKind::AssistantStream, &self.attempt_part())
    }

    pub fn final_item_id(&self) -> String {
        self.identity
            .item_id(ItemKind::AssistantFinal, &self.attempt_part())
    }

    fn attempt_part(&self) -> String {
        if self.attempt_index == 0 {
            "main".to_string()
        } else {
            format!("retry-{}", self.attempt_index)
        }
    }

    /// 路由状态与降级状态合并后的运行时状态
    pub fn runtime_status(&self) -> Option<String> {
        merge_status([self.routing_status.as_deref(), self.fallback_status.as_deref()])
    }

    /// 发送前按路由建议换用模型，本轮尚未尝试任何模型
    pub fn apply_routing(&mut self, decision: RoutingDecision, budget_mode: BudgetMode) {
        self.routing_metadata = Some(RoutingMetadata {
            from_model_id: Some(self.model.id.clone()),
            to_model_id: decision.model.id.clone(),
            reason: decision.reason.clone(),
            mode: RoutingMode::Auto,
            budget_mode,
            timestamp: Utc::now(),
        });
        self.routing_status = Some(decision.reason);
        self.tried_ids = HashSet::from([decision.model.id.clone()]);
        self.model = decision.model;
    }

    /// 切换到降级候选
    pub fn record_fallback(&mut self, next: AIModel) {
        self.attempt_index += 1;
        self.fallback_status = Some(fallback_status_text(&next.name, self.attempt_index));
        self.tried_ids.insert(next.id.clone());
        self.model = next;
    }

    pub fn has_fallen_back(&self) -> bool {
        self.attempt_index > 0
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_context() -> TurnContext {
        TurnContext::new(
            TurnIdentity::new("conv", Uuid::nil()),
            ChatConfig::default(),
            AIModel::new("openrouter-a", "A", "a/a"),
            false,
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_initial_model_is_tried() {
        let ctx = create_context();
        assert!(ctx.tried_ids.contains("openrouter-a"));
        assert!(ctx.stream_item_id().ends_with("|k:assistant_stream|p:main"));
        assert!(ctx.runtime_status().is_none());
    }

    #[test]
    fn test_record_fallback() {
        let mut ctx = create_context();
        ctx.routing_status = Some("智能路由：coding · 免费优先".to_string());
        ctx.record_fallback(AIModel::new("openrouter-b", "Bravo", "b/b"));

        assert_eq!(ctx.model.id, "openrouter-b");
        assert_eq!(ctx.attempt_index, 1);
        assert!(ctx.tried_ids.contains("openrouter-b"));
        assert!(ctx.final_item_id().ends_with("|k:assistant_final|p:retry-1"));
        assert_eq!(
            ctx.runtime_status().unwrap(),
            "智能路由：coding · 免费优先 · 已切换到 Bravo（重试 1 次）"
        );
    }

    #[test]
    fn test_apply_routing_resets_tried_set() {
        let mut ctx = create_context();
        ctx.apply_routing(
            RoutingDecision {
                model: AIModel::new("openrouter-c", "Coder", "c/c"),
                reason: "智能路由：coding · 性价比".to_string(),
            },
            BudgetMode::CostEffective,
        );

        assert_eq!(ctx.model.id, "openrouter-c");
        assert_eq!(ctx.tried_ids, HashSet::from(["openrouter-c".to_string()]));
        let metadata = ctx.routing_metadata.as_ref().unwrap();
        assert_eq!(metadata.from_model_id.as_deref(), Some("openrouter-a"));
        assert_eq!(metadata.mode, RoutingMode::Auto);
        assert_eq!(metadata.budget_mode, BudgetMode::CostEffective);
        assert_eq!(ctx.runtime_status().unwrap(), "智能路由：coding · 性价比");
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(TurnEndReason::NonStreamDone.as_str(), "non_stream_done");
        assert!(TurnEndReason::SpecialResponse.is_success());
        assert!(!TurnEndReason::Cancelled.is_success());
    }
}

//! 预算模式
//!
//! 同一个预算模式同时决定路由打分与降级候选排序。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::AIModel;

/// 无法解析的单价按极高价格计
pub const UNKNOWN_UNIT_PRICE: f64 = f64::MAX / 4.0;

/// 预算模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// 免费优先
    #[default]
    FreeFirst,
    /// 性价比
    CostEffective,
    /// 质量优先
    QualityFirst,
}

impl BudgetMode {
    /// 获取显示名称
    pub fn title(&self) -> &'static str {
        match self {
            BudgetMode::FreeFirst => "免费优先",
            BudgetMode::CostEffective => "性价比",
            BudgetMode::QualityFirst => "质量优先",
        }
    }
}

/// 输入与输出单价之和
pub fn total_unit_price(model: &AIModel) -> f64 {
    model.prompt_rate().unwrap_or(UNKNOWN_UNIT_PRICE)
        + model.completion_rate().unwrap_or(UNKNOWN_UNIT_PRICE)
}

/// 按总单价升序，同价按名称（忽略大小写）
pub(crate) fn compare_cost(lhs: &AIModel, rhs: &AIModel) -> Ordering {
    total_unit_price(lhs)
        .partial_cmp(&total_unit_price(rhs))
        .unwrap_or(Ordering::Equal)
        .then_with(|| lhs.name.to_lowercase().cmp(&rhs.name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelPricing;

    #[test]
    fn test_unknown_price_is_most_expensive() {
        let priced = AIModel::new("p", "P", "p/p").with_pricing(ModelPricing::new("0.01", "0.02"));
        let unpriced = AIModel::new("u", "U", "u/u");
        assert_eq!(compare_cost(&priced, &unpriced), Ordering::Less);
        assert!(total_unit_price(&unpriced).is_finite());
    }

    #[test]
    fn test_same_price_orders_by_name() {
        let a = AIModel::new("1", "alpha", "a").with_pricing(ModelPricing::new("0", "0"));
        let b = AIModel::new("2", "Beta", "b").with_pricing(ModelPricing::new("0", "0"));
        assert_eq!(compare_cost(&a, &b), Ordering::Less);
        assert_eq!(compare_cost(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_budget_mode_serde() {
        assert_eq!(
            serde_json::to_string(&BudgetMode::QualityFirst).unwrap(),
            "\"quality_first\""
        );
        assert_eq!(BudgetMode::default(), BudgetMode::FreeFirst);
    }
}

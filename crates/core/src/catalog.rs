//! 模型目录抽象

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::AIModel;

/// 模型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFilter {
    #[default]
    All,
    FreeOnly,
}

impl ModelFilter {
    pub fn apply(&self, models: &[AIModel]) -> Vec<AIModel> {
        match self {
            ModelFilter::All => models.to_vec(),
            ModelFilter::FreeOnly => models.iter().filter(|m| m.is_free()).cloned().collect(),
        }
    }
}

/// 模型目录
///
/// 实现可以走缓存；拉取失败时返回过期列表或空列表，不向编排器传播错误。
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn fetch(&self, filter: ModelFilter) -> Vec<AIModel>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelPricing;

    #[test]
    fn test_free_only_filter() {
        let models = vec![
            AIModel::new("a", "A", "a/a").with_pricing(ModelPricing::new("0", "0")),
            AIModel::new("b", "B", "b/b").with_pricing(ModelPricing::new("0.1", "0")),
            AIModel::new("c", "C", "c/c"),
        ];
        let free = ModelFilter::FreeOnly.apply(&models);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, "a");
        assert_eq!(ModelFilter::All.apply(&models).len(), 3);
    }
}

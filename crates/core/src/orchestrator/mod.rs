//! 模型编排模块
//!
//! 根据任务意图与预算模式推荐模型，并在可重试失败后规划降级候选。
//!
//! ## 模块结构
//!
//! - `budget` - 预算模式与价格比较
//! - `router` - 发送前的模型推荐
//! - `fallback` - 失败后的降级候选

mod budget;
mod fallback;
mod router;

pub use budget::{total_unit_price, BudgetMode, UNKNOWN_UNIT_PRICE};
pub use fallback::{FallbackPlanner, FallbackSettings};
pub use router::{ModelRouter, RoutingDecision};

//! 渲染输出
//!
//! 核心不直接驱动视图，只产出有序的行列表与一次更新动作，由渲染层解释。
//!
//! - `rows` - 行构建
//! - `status` - 状态行与指标文案
//! - `diff` - 流式更新规划

mod diff;
mod rows;
mod status;

pub use diff::{ChatListSnapshot, ChatListState, ChatTableUpdateAction, StreamDiffPlanner};
pub use rows::{build_rows, ChatRow, StopNotice, STOPPED_NOTICE_TEXT};
pub use status::{
    compose_status_text, fallback_status_text, format_cost, format_integer, format_latency,
    merge_status, metrics_status, STATUS_SEPARATOR,
};

//! 轮次稳定标识
//!
//! `item_id` 只由会话 ID、轮次 ID、类别和分片决定，重试与重新渲染时保持不变，
//! 日志可以据此关联同一逻辑条目。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 条目类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    UserMsg,
    AssistantStream,
    AssistantFinal,
    Error,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::UserMsg => "user_msg",
            ItemKind::AssistantStream => "assistant_stream",
            ItemKind::AssistantFinal => "assistant_final",
            ItemKind::Error => "error",
        }
    }
}

/// `c:{conversation}|t:{turn}`
pub fn make_base_id(conversation_id: &str, turn_id: &Uuid) -> String {
    format!("c:{conversation_id}|t:{turn_id}")
}

/// `{base}|k:{kind}|p:{part}`
pub fn make_item_id(base_id: &str, kind: ItemKind, part: &str) -> String {
    format!("{base_id}|k:{}|p:{part}", kind.as_str())
}

/// 单轮对话的标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnIdentity {
    pub conversation_id: String,
    pub turn_id: Uuid,
    pub base_id: String,
}

impl TurnIdentity {
    pub fn new(conversation_id: impl Into<String>, turn_id: Uuid) -> Self {
        let conversation_id = conversation_id.into();
        let base_id = make_base_id(&conversation_id, &turn_id);
        Self {
            conversation_id,
            turn_id,
            base_id,
        }
    }

    pub fn item_id(&self, kind: ItemKind, part: &str) -> String {
        make_item_id(&self.base_id, kind, part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_is_deterministic() {
        let turn_id = Uuid::new_v4();
        let a = TurnIdentity::new("conv-1", turn_id);
        let b = TurnIdentity::new("conv-1", turn_id);
        assert_eq!(
            a.item_id(ItemKind::AssistantStream, "main"),
            b.item_id(ItemKind::AssistantStream, "main")
        );
    }

    #[test]
    fn test_item_id_format() {
        let turn_id = Uuid::nil();
        let identity = TurnIdentity::new("abc", turn_id);
        assert_eq!(
            identity.base_id,
            "c:abc|t:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            identity.item_id(ItemKind::Error, "model_not_ready"),
            "c:abc|t:00000000-0000-0000-0000-000000000000|k:error|p:model_not_ready"
        );
    }

    #[test]
    fn test_kinds_produce_distinct_ids() {
        let identity = TurnIdentity::new("abc", Uuid::new_v4());
        assert_ne!(
            identity.item_id(ItemKind::UserMsg, "main"),
            identity.item_id(ItemKind::AssistantFinal, "main")
        );
    }
}

//! 共享配置句柄

use parking_lot::RwLock;
use std::sync::Arc;

use crate::types::ChatConfig;

/// 配置访问句柄
///
/// 克隆开销很小，所有克隆共享同一份配置。编排器每轮只取一次快照，
/// 轮次进行中的修改从下一轮开始生效。
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<ChatConfig>>,
}

impl ConfigHandle {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// 当前配置快照
    pub fn snapshot(&self) -> ChatConfig {
        self.inner.read().clone()
    }

    /// 读取单项
    pub fn read<T>(&self, f: impl FnOnce(&ChatConfig) -> T) -> T {
        f(&self.inner.read())
    }

    /// 修改配置
    pub fn update(&self, f: impl FnOnce(&mut ChatConfig)) {
        let mut guard = self.inner.write();
        f(&mut guard);
        tracing::debug!("[Config] 配置已更新");
    }
}

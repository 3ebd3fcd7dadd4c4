//! 带 TTL 缓存的模型目录
//!
//! 缓存未过期时直接返回；过期或为空时刷新。刷新失败记录警告后返回旧列表（或空列表），
//! 刷新得到空列表时不写入缓存。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use easyai_core::{AIModel, ChatFailure, ModelCatalog, ModelFilter};

/// 模型列表来源
#[async_trait]
pub trait ModelSource: Send + Sync {
    async fn list_models(&self) -> Result<Vec<AIModel>, ChatFailure>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    models: Vec<AIModel>,
    fetched_at: DateTime<Utc>,
}

/// 带缓存的模型目录
pub struct CachedModelCatalog<S> {
    source: S,
    ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
}

impl<S: ModelSource> CachedModelCatalog<S> {
    pub fn new(source: S, ttl_secs: u64) -> Self {
        let ttl_secs = i64::from(u32::try_from(ttl_secs).unwrap_or(u32::MAX));
        Self {
            source,
            ttl: Duration::seconds(ttl_secs),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// 使缓存失效，下次 `fetch` 强制刷新
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
        tracing::debug!("[ModelCatalog] 缓存已失效");
    }

    /// 缓存的拉取时间
    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.cache.read().await.as_ref().map(|entry| entry.fetched_at)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        !entry.models.is_empty() && now - entry.fetched_at < self.ttl
    }

    async fn models(&self) -> Vec<AIModel> {
        let now = Utc::now();
        if let Some(entry) = self.cache.read().await.as_ref() {
            if self.is_fresh(entry, now) {
                tracing::debug!("[ModelCatalog] 命中缓存: {} 个模型", entry.models.len());
                return entry.models.clone();
            }
        }

        let mut cache = self.cache.write().await;
        // 等待写锁期间可能已被其他任务刷新
        if let Some(entry) = cache.as_ref() {
            if self.is_fresh(entry, Utc::now()) {
                return entry.models.clone();
            }
        }

        match self.source.list_models().await {
            Ok(models) if !models.is_empty() => {
                tracing::info!("[ModelCatalog] 刷新完成: {} 个模型", models.len());
                *cache = Some(CacheEntry {
                    models: models.clone(),
                    fetched_at: Utc::now(),
                });
                models
            }
            Ok(_) => {
                tracing::warn!("[ModelCatalog] 刷新结果为空，不写入缓存");
                cache.as_ref().map(|e| e.models.clone()).unwrap_or_default()
            }
            Err(e) => {
                tracing::warn!(
                    "[ModelCatalog] 刷新失败，使用旧列表: {}",
                    easyai_core::sanitizer::redact(&e.to_string())
                );
                cache.as_ref().map(|e| e.models.clone()).unwrap_or_default()
            }
        }
    }
}

#[async_trait]
impl<S: ModelSource> ModelCatalog for CachedModelCatalog<S> {
    async fn fetch(&self, filter: ModelFilter) -> Vec<AIModel> {
        let models = self.models().await;
        filter.apply(&models)
    }
}

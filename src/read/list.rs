//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了整表列表缓存，整张有序列表存放在一个缓存键下。

use crate::backend::CacheStore;
use crate::config::NamespaceConfig;
use crate::domain::Record;
use crate::error::{CacheError, Result};
use crate::keys::KeySpace;
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{Serializer, SerializerEnum};
use crate::source::ListSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// 列表缓存
pub struct ListCache<R: Record> {
    cache: Arc<dyn CacheStore>,
    source: Arc<dyn ListSource<R>>,
    keys: KeySpace,
    ttl: Duration,
    not_found_message: String,
    serializer: SerializerEnum,
}

impl<R: Record> std::fmt::Debug for ListCache<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListCache")
            .field("key", &self.keys.list_key())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<R: Record> ListCache<R> {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn ListSource<R>>,
        keys: KeySpace,
        config: &NamespaceConfig,
    ) -> Self {
        Self {
            cache,
            source,
            keys,
            ttl: config.ttl(),
            not_found_message: config.not_found_message.clone(),
            serializer: SerializerEnum::default(),
        }
    }

    /// 读取整张列表
    ///
    /// 命中直接反序列化返回；未命中回源并按 `sort_key` 排序后写回。
    /// 数据源为空时返回 `CacheError::NotFound` 且不写缓存。
    #[instrument(skip(self), level = "debug", fields(namespace = %self.keys.namespace()))]
    pub async fn query_list(&self) -> Result<Vec<R>> {
        let key = self.keys.list_key();
        let namespace = self.keys.namespace();

        if let Some(bytes) = self.cache.get(&key).await? {
            if !bytes.is_empty() {
                GLOBAL_METRICS.record_request(namespace, "cache", "list", "hit");
                return self.serializer.deserialize(&bytes);
            }
        }
        GLOBAL_METRICS.record_request(namespace, "cache", "list", "miss");

        let mut items = self.source.list_all().await?;
        GLOBAL_METRICS.record_request(namespace, "store", "list", "ok");
        if items.is_empty() {
            return Err(CacheError::NotFound(self.not_found_message.clone()));
        }
        items.sort_by_key(|item| item.sort_key());

        let bytes = self.serializer.serialize(&items)?;
        if let Err(e) = self.cache.set(&key, bytes, Some(self.ttl)).await {
            warn!("Failed to cache list {}: {}", key, e);
        } else {
            debug!("Cached {} items under {}", items.len(), key);
        }
        Ok(items)
    }

    /// 删除列表缓存
    pub async fn invalidate(&self) -> Result<bool> {
        self.cache.delete(&self.keys.list_key()).await
    }
}

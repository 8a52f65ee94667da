//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了旁路缓存读取器，使用空值缓存防止缓存穿透。

use crate::backend::CacheStore;
use crate::config::NamespaceConfig;
use crate::domain::Record;
use crate::error::Result;
use crate::keys::KeySpace;
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::{Serializer, SerializerEnum};
use crate::source::RecordStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// 缓存探测结果
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<R> {
    /// 命中真实记录
    Hit(R),
    /// 命中空值标记，记录确定不存在
    Negative,
    /// 缓存中没有该键
    Miss,
}

/// 旁路缓存读取器
///
/// 命中则直接返回；空值标记说明记录不存在，不再访问数据源；
/// 未命中时回源，并把结果（或空值标记）写回缓存
pub struct CacheAsideReader<R: Record> {
    cache: Arc<dyn CacheStore>,
    records: Arc<dyn RecordStore<R>>,
    keys: KeySpace,
    ttl: Duration,
    null_ttl: Duration,
    serializer: SerializerEnum,
}

impl<R: Record> std::fmt::Debug for CacheAsideReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAsideReader")
            .field("namespace", &self.keys.namespace())
            .field("cache", &self.cache.name())
            .field("ttl", &self.ttl)
            .field("null_ttl", &self.null_ttl)
            .finish()
    }
}

impl<R: Record> CacheAsideReader<R> {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        records: Arc<dyn RecordStore<R>>,
        keys: KeySpace,
        config: &NamespaceConfig,
    ) -> Self {
        Self {
            cache,
            records,
            keys,
            ttl: config.ttl(),
            null_ttl: config.null_ttl(),
            serializer: SerializerEnum::default(),
        }
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn records(&self) -> &Arc<dyn RecordStore<R>> {
        &self.records
    }

    pub fn serializer(&self) -> &SerializerEnum {
        &self.serializer
    }

    pub fn null_ttl(&self) -> Duration {
        self.null_ttl
    }

    fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// 只查缓存，不访问数据源
    #[instrument(skip(self), level = "debug", fields(namespace = %self.keys.namespace()))]
    pub async fn probe(&self, id: i64) -> Result<Probe<R>> {
        let key = self.keys.cache_key(id);
        let probe = match self.cache.get(&key).await? {
            None => Probe::Miss,
            Some(bytes) if bytes.is_empty() => Probe::Negative,
            Some(bytes) => Probe::Hit(self.serializer.deserialize(&bytes)?),
        };
        let result = match &probe {
            Probe::Hit(_) => "hit",
            Probe::Negative => "null",
            Probe::Miss => "miss",
        };
        GLOBAL_METRICS.record_request(self.namespace(), "cache", "get", result);
        Ok(probe)
    }

    /// 从数据源读取一条记录并计入指标
    pub async fn fetch(&self, id: i64) -> Result<Option<R>> {
        let start = Instant::now();
        let result = self.records.get(id).await;
        GLOBAL_METRICS.record_duration(
            self.namespace(),
            "store",
            "get",
            start.elapsed().as_secs_f64(),
        );
        let outcome = match &result {
            Ok(Some(_)) => "found",
            Ok(None) => "absent",
            Err(_) => "error",
        };
        GLOBAL_METRICS.record_request(self.namespace(), "store", "get", outcome);
        result
    }

    /// 回源并写回缓存
    ///
    /// 记录不存在时写入空值标记（`null_ttl`），存在时写入序列化后的记录（`ttl`）。
    /// 写缓存失败只记录日志，不影响返回值。
    #[instrument(skip(self), level = "debug", fields(namespace = %self.keys.namespace()))]
    pub async fn load_and_fill(&self, id: i64) -> Result<Option<R>> {
        let key = self.keys.cache_key(id);
        match self.fetch(id).await? {
            None => {
                debug!("Record {} absent, caching null marker for {:?}", id, self.null_ttl);
                self.write_quietly(&key, Vec::new(), self.null_ttl).await;
                Ok(None)
            }
            Some(record) => {
                let bytes = self.serializer.serialize(&record)?;
                self.write_quietly(&key, bytes, self.ttl).await;
                Ok(Some(record))
            }
        }
    }

    /// 旁路缓存读取
    ///
    /// # 返回值
    ///
    /// `Ok(None)` 表示记录不存在
    pub async fn read_through(&self, id: i64) -> Result<Option<R>> {
        match self.probe(id).await? {
            Probe::Hit(record) => Ok(Some(record)),
            Probe::Negative => Ok(None),
            Probe::Miss => self.load_and_fill(id).await,
        }
    }

    /// 删除缓存项
    pub async fn invalidate(&self, id: i64) -> Result<bool> {
        let removed = self.cache.delete(&self.keys.cache_key(id)).await?;
        GLOBAL_METRICS.record_request(self.namespace(), "cache", "delete", "ok");
        Ok(removed)
    }

    async fn write_quietly(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        if let Err(e) = self.cache.set(key, bytes, Some(ttl)).await {
            warn!("Failed to write cache entry {}: {}", key, e);
            GLOBAL_METRICS.record_request(self.namespace(), "cache", "set", "error");
        }
    }
}

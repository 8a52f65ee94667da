//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 moka 的进程内缓存存储，适用于单实例部署和测试。

use super::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

// 值: (数据, 过期时间)
type Slot = (Vec<u8>, Option<Instant>);

/// 内存缓存存储
///
/// 过期时间随值一起保存，在读取时检查；条件写入和比较删除通过
/// moka 的逐键原子计算实现
#[derive(Clone)]
pub struct MemoryStore {
    cache: Cache<String, Slot>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MemoryStore {
    /// 创建新的内存缓存存储
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    fn is_live(slot: &Slot) -> bool {
        match slot.1 {
            Some(expire_at) => Instant::now() < expire_at,
            None => true,
        }
    }

    fn deadline(ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|t| Instant::now() + t)
    }

    async fn live_slot(&self, key: &str) -> Option<Slot> {
        let slot = self.cache.get(key).await?;
        if Self::is_live(&slot) {
            Some(slot)
        } else {
            self.cache.remove(key).await;
            debug!("Memory store: key={} expired, removed", key);
            None
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.live_slot(key).await.map(|(bytes, _)| bytes))
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.cache
            .insert(key.to_string(), (value, Self::deadline(ttl)))
            .await;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.cache.remove(key).await;
        Ok(removed.map(|slot| Self::is_live(&slot)).unwrap_or(false))
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let slot: Slot = (value.as_bytes().to_vec(), Self::deadline(Some(ttl)));
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(move |existing| {
                let occupied = existing
                    .map(|entry| Self::is_live(entry.value()))
                    .unwrap_or(false);
                let op = if occupied { Op::Nop } else { Op::Put(slot) };
                std::future::ready(op)
            })
            .await;
        let acquired = matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        );
        debug!("Memory store set_if_absent: key={}, acquired={}", key, acquired);
        Ok(acquired)
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(move |existing| {
                let op = match existing {
                    Some(entry) if Self::is_live(entry.value()) => {
                        let (bytes, _) = entry.into_value();
                        Op::Put((bytes, Self::deadline(Some(ttl))))
                    }
                    Some(_) => Op::Remove,
                    None => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    #[instrument(skip(self, expected), level = "debug")]
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let expected = expected.as_bytes().to_vec();
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(move |existing| {
                let op = match existing {
                    Some(entry) if Self::is_live(entry.value()) && entry.value().0 == expected => {
                        Op::Remove
                    }
                    _ => Op::Nop,
                };
                std::future::ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::Removed(_)))
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self
            .live_slot(key)
            .await
            .and_then(|(_, expire_at)| expire_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

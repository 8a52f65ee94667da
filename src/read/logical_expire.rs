//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了逻辑过期策略。
//!
//! 信封不设物理TTL；逻辑过期后立即返回旧值，同时由抢到锁的调用方
//! 向重建线程池提交一次异步重建。

use super::load_under_mutex;
use super::pass_through::CacheAsideReader;
use crate::config::{NamespaceConfig, RetryPolicy};
use crate::domain::Record;
use crate::envelope::LogicalEnvelope;
use crate::error::{CacheError, Result};
use crate::lock::DistributedLock;
use crate::metrics::GLOBAL_METRICS;
use crate::serialization::Serializer;
use crate::sync::rebuild::RebuildPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// 逻辑过期策略
pub struct LogicalExpire<R: Record> {
    reader: Arc<CacheAsideReader<R>>,
    lock: DistributedLock,
    pool: Arc<RebuildPool>,
    logical_ttl: Duration,
    load_on_miss: bool,
    retry: RetryPolicy,
}

impl<R: Record> std::fmt::Debug for LogicalExpire<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalExpire")
            .field("reader", &self.reader)
            .field("pool", &self.pool.name())
            .field("logical_ttl", &self.logical_ttl)
            .field("load_on_miss", &self.load_on_miss)
            .finish()
    }
}

/// 读取到的信封状态
enum Slot<R> {
    Absent,
    Null,
    Envelope(LogicalEnvelope<R>),
}

impl<R: Record> LogicalExpire<R> {
    pub fn new(
        reader: Arc<CacheAsideReader<R>>,
        lock: DistributedLock,
        pool: Arc<RebuildPool>,
        config: &NamespaceConfig,
    ) -> Self {
        Self {
            reader,
            lock,
            pool,
            logical_ttl: config.logical_ttl(),
            load_on_miss: config.load_on_miss,
            retry: config.retry.clone(),
        }
    }

    pub fn logical_ttl(&self) -> Duration {
        self.logical_ttl
    }

    fn namespace(&self) -> &str {
        self.reader.keys().namespace()
    }

    async fn read_slot(reader: &CacheAsideReader<R>, id: i64) -> Result<Slot<R>> {
        let key = reader.keys().cache_key(id);
        Ok(match reader.cache().get(&key).await? {
            None => Slot::Absent,
            Some(bytes) if bytes.is_empty() => Slot::Null,
            Some(bytes) => Slot::Envelope(reader.serializer().deserialize(&bytes)?),
        })
    }

    /// 逻辑过期读取
    ///
    /// # 返回值
    ///
    /// 未过期返回新值；已过期返回旧值并尝试调度一次重建；
    /// `Ok(None)` 表示记录不存在（或未开启缺失回源时缓存中没有）
    #[instrument(skip(self), level = "debug", fields(namespace = %self.namespace()))]
    pub async fn query_with_logical_expire(&self, id: i64) -> Result<Option<R>> {
        match Self::read_slot(&self.reader, id).await? {
            Slot::Absent => {
                GLOBAL_METRICS.record_request(self.namespace(), "cache", "get", "miss");
                if self.load_on_miss {
                    self.load_missing(id).await
                } else {
                    Ok(None)
                }
            }
            Slot::Null => {
                GLOBAL_METRICS.record_request(self.namespace(), "cache", "get", "null");
                Ok(None)
            }
            Slot::Envelope(envelope) => {
                if !envelope.is_expired() {
                    GLOBAL_METRICS.record_request(self.namespace(), "cache", "get", "hit");
                    return Ok(Some(envelope.data));
                }
                GLOBAL_METRICS.record_request(self.namespace(), "cache", "get", "stale");
                self.schedule_rebuild(id).await;
                Ok(Some(envelope.data))
            }
        }
    }

    /// 抢锁并提交一次重建，锁被占用时什么都不做
    async fn schedule_rebuild(&self, id: i64) {
        let lock_key = self.reader.keys().lock_key(id);
        let token = match self.lock.try_acquire(&lock_key).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("Rebuild of {} already in progress", lock_key);
                return;
            }
            Err(e) => {
                warn!("Failed to acquire rebuild lock {}: {}", lock_key, e);
                return;
            }
        };

        let reader = self.reader.clone();
        let lock = self.lock.clone();
        let job_token = token.clone();
        let logical_ttl = self.logical_ttl;
        let job = async move {
            let namespace = reader.keys().namespace().to_string();
            let start = Instant::now();
            let result = lock
                .run_then_release(&job_token, Self::rebuild(&reader, id, logical_ttl))
                .await;
            GLOBAL_METRICS.record_duration(
                &namespace,
                "rebuild",
                "run",
                start.elapsed().as_secs_f64(),
            );
            match result {
                Ok(()) => {
                    GLOBAL_METRICS.record_request(&namespace, "rebuild", "run", "ok");
                }
                Err(e) => {
                    GLOBAL_METRICS.record_request(&namespace, "rebuild", "run", "error");
                    warn!("Rebuild of {}:{} failed: {}", namespace, id, e);
                }
            }
        };

        match self.pool.try_submit(job) {
            Ok(()) => {
                GLOBAL_METRICS.record_request(self.namespace(), "rebuild", "submit", "ok");
            }
            Err(e) => {
                // 任务没有机会释放锁，这里立即释放
                GLOBAL_METRICS.record_request(self.namespace(), "rebuild", "submit", "rejected");
                warn!("Rebuild of {} not scheduled, serving stale value: {}", lock_key, e);
                self.lock.release_quietly(&token).await;
            }
        }
    }

    /// 重建：重新回源并写入新信封；记录已被删除时清除缓存项
    async fn rebuild(reader: &CacheAsideReader<R>, id: i64, logical_ttl: Duration) -> Result<()> {
        let key = reader.keys().cache_key(id);
        match reader.fetch(id).await? {
            Some(record) => {
                Self::write_envelope(reader, id, record, logical_ttl).await?;
                debug!("Rebuilt logical envelope {}", key);
            }
            None => {
                reader.cache().delete(&key).await?;
                debug!("Record behind {} vanished, entry removed", key);
            }
        }
        Ok(())
    }

    async fn write_envelope(
        reader: &CacheAsideReader<R>,
        id: i64,
        record: R,
        logical_ttl: Duration,
    ) -> Result<R> {
        let envelope = LogicalEnvelope::new(record, logical_ttl);
        let bytes = reader.serializer().serialize(&envelope)?;
        reader
            .cache()
            .set(&reader.keys().cache_key(id), bytes, None)
            .await?;
        Ok(envelope.data)
    }

    /// 缓存中没有信封时，按互斥协议同步回源
    async fn load_missing(&self, id: i64) -> Result<Option<R>> {
        let reader = &self.reader;
        let logical_ttl = self.logical_ttl;
        let lock_key = reader.keys().lock_key(id);

        load_under_mutex(
            &self.lock,
            &lock_key,
            self.namespace(),
            &self.retry,
            move || async move {
                Ok::<_, CacheError>(match Self::read_slot(reader, id).await? {
                    Slot::Absent => None,
                    Slot::Null => Some(None),
                    Slot::Envelope(envelope) => Some(Some(envelope.data)),
                })
            },
            move || async move {
                let loaded = match reader.fetch(id).await? {
                    Some(record) => {
                        Some(Self::write_envelope(reader, id, record, logical_ttl).await?)
                    }
                    None => {
                        reader
                            .cache()
                            .set(&reader.keys().cache_key(id), Vec::new(), Some(reader.null_ttl()))
                            .await?;
                        None
                    }
                };
                Ok::<_, CacheError>(loaded)
            },
        )
        .await
    }

    /// 预热：回源并写入信封
    ///
    /// # 返回值
    ///
    /// 记录存在并已写入返回 `true`，数据源中不存在返回 `false`
    #[instrument(skip(self), level = "debug", fields(namespace = %self.namespace()))]
    pub async fn warm_up(&self, id: i64, logical_ttl: Duration) -> Result<bool> {
        match self.reader.fetch(id).await? {
            Some(record) => {
                Self::write_envelope(&self.reader, id, record, logical_ttl).await?;
                GLOBAL_METRICS.record_request(self.namespace(), "cache", "warmup", "ok");
                Ok(true)
            }
            None => {
                GLOBAL_METRICS.record_request(self.namespace(), "cache", "warmup", "absent");
                Ok(false)
            }
        }
    }
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了带缓存的记录仓库，是读写路径的统一入口。
//!
//! 读取按键空间配置的策略分派；写入先更新数据源，再删除缓存项。

use crate::backend::CacheStore;
use crate::config::{NamespaceConfig, ReadStrategy};
use crate::domain::Record;
use crate::dto::Outcome;
use crate::error::{CacheError, Result};
use crate::keys::KeySpace;
use crate::lock::DistributedLock;
use crate::metrics::GLOBAL_METRICS;
use crate::read::{CacheAsideReader, LogicalExpire, MutexRebuild};
use crate::source::RecordStore;
use crate::sync::rebuild::RebuildPool;
use crate::sync::warmup::{WarmupManager, WarmupResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

enum Strategy<R: Record> {
    PassThrough,
    Mutex(MutexRebuild<R>),
    LogicalExpire(LogicalExpire<R>),
}

/// 带缓存的记录仓库
pub struct CachedRepository<R: Record> {
    reader: Arc<CacheAsideReader<R>>,
    strategy: Strategy<R>,
    config: NamespaceConfig,
    warmup: WarmupManager,
}

impl<R: Record> std::fmt::Debug for CachedRepository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRepository")
            .field("namespace", &self.namespace())
            .field("strategy", &self.config.strategy)
            .finish()
    }
}

impl<R: Record> CachedRepository<R> {
    /// 创建仓库
    ///
    /// # 参数
    ///
    /// * `namespace` - 键空间名称
    /// * `cache` - 缓存存储
    /// * `records` - 权威数据源
    /// * `pool` - 逻辑过期策略使用的重建线程池
    /// * `config` - 键空间配置
    pub fn new(
        namespace: &str,
        cache: Arc<dyn CacheStore>,
        records: Arc<dyn RecordStore<R>>,
        pool: Arc<RebuildPool>,
        config: NamespaceConfig,
    ) -> Self {
        let keys = KeySpace::from_config(namespace, &config);
        let reader = Arc::new(CacheAsideReader::new(
            cache.clone(),
            records,
            keys,
            &config,
        ));
        let lock = DistributedLock::new(cache, namespace, config.lock_ttl(), config.release_mode);

        let strategy = match config.strategy {
            ReadStrategy::PassThrough => Strategy::PassThrough,
            ReadStrategy::Mutex => Strategy::Mutex(MutexRebuild::new(reader.clone(), lock, &config)),
            ReadStrategy::LogicalExpire => Strategy::LogicalExpire(LogicalExpire::new(
                reader.clone(),
                lock,
                pool,
                &config,
            )),
        };

        Self {
            warmup: WarmupManager::new(namespace, config.warmup.clone()),
            reader,
            strategy,
            config,
        }
    }

    pub fn namespace(&self) -> &str {
        self.reader.keys().namespace()
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.config.strategy
    }

    pub fn keys(&self) -> &KeySpace {
        self.reader.keys()
    }

    pub fn warmup_manager(&self) -> &WarmupManager {
        &self.warmup
    }

    /// 按配置的策略读取，`Ok(None)` 表示记录不存在
    #[instrument(skip(self), level = "debug", fields(namespace = %self.namespace()))]
    pub async fn get(&self, id: i64) -> Result<Option<R>> {
        let start = Instant::now();
        let result = match &self.strategy {
            Strategy::PassThrough => self.reader.read_through(id).await,
            Strategy::Mutex(strategy) => strategy.query_with_mutex(id).await,
            Strategy::LogicalExpire(strategy) => strategy.query_with_logical_expire(id).await,
        };
        GLOBAL_METRICS.record_duration(
            self.namespace(),
            "cache",
            "read",
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// 读取并包装为统一结果
    ///
    /// 记录不存在时返回配置的 `not_found_message`
    pub async fn read_by_id(&self, id: i64) -> Outcome<R> {
        match self.get(id).await {
            Ok(Some(record)) => Outcome::ok(record),
            Ok(None) => Outcome::fail(self.config.not_found_message.clone()),
            Err(e) => {
                warn!("Read of {}:{} failed: {}", self.namespace(), id, e);
                Outcome::from(e)
            }
        }
    }

    /// 写路径：先写数据源，再删除缓存项
    ///
    /// 数据源写入成功后删除缓存失败只记录日志，缓存项会在TTL到期后失效
    #[instrument(skip(self, record), level = "debug", fields(namespace = %self.namespace()))]
    pub async fn try_update(&self, record: &R) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| CacheError::InvalidRecord("record id must not be empty".to_string()))?;

        let start = Instant::now();
        let written = self.reader.records().update(record).await;
        GLOBAL_METRICS.record_duration(
            self.namespace(),
            "store",
            "update",
            start.elapsed().as_secs_f64(),
        );
        GLOBAL_METRICS.record_request(
            self.namespace(),
            "store",
            "update",
            if written.is_ok() { "ok" } else { "error" },
        );
        written?;

        if let Err(e) = self.invalidate(id).await {
            warn!(
                "Record {}:{} updated but cache delete failed, stale until TTL: {}",
                self.namespace(),
                id,
                e
            );
        }
        Ok(())
    }

    /// 写路径，返回统一结果
    pub async fn update(&self, record: &R) -> Outcome<()> {
        match self.try_update(record).await {
            Ok(()) => Outcome::ok_empty(),
            Err(e) => Outcome::from(e),
        }
    }

    /// 删除缓存项
    pub async fn invalidate(&self, id: i64) -> Result<bool> {
        let removed = self.reader.invalidate(id).await?;
        debug!(
            "Invalidated {}: existed={}",
            self.reader.keys().cache_key(id),
            removed
        );
        Ok(removed)
    }

    /// 预热单条记录
    ///
    /// 逻辑过期策略写入信封，其余策略按普通TTL写入。
    /// 记录不存在时返回 `false`
    pub async fn warm_up(&self, id: i64) -> Result<bool> {
        match &self.strategy {
            Strategy::LogicalExpire(strategy) => {
                strategy.warm_up(id, strategy.logical_ttl()).await
            }
            _ => Ok(self.reader.load_and_fill(id).await?.is_some()),
        }
    }

    /// 按键空间配置的id列表批量预热
    pub async fn warm_up_configured(&self) -> Result<WarmupResult> {
        self.warmup
            .run_warmup(|ids| async move {
                let mut loaded = 0usize;
                for id in ids {
                    match self.warm_up(id).await {
                        Ok(true) => loaded += 1,
                        Ok(false) => debug!("Warmup skipped absent record {}", id),
                        Err(e) => warn!("Warmup of {} failed: {}", id, e),
                    }
                }
                Ok(loaded)
            })
            .await
    }
}

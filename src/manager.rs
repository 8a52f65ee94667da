//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存管理器，负责按配置构建缓存存储和重建线程池，
//! 并为每个键空间创建仓库。

use crate::backend::{CacheStore, MemoryStore, RedisStore};
use crate::config::{Config, StoreBackend};
use crate::domain::Record;
use crate::error::{CacheError, Result};
use crate::keys::KeySpace;
use crate::metrics::GLOBAL_METRICS;
use crate::read::ListCache;
use crate::repository::CachedRepository;
use crate::source::{ListSource, RecordStore};
use crate::sync::rebuild::RebuildPool;
use std::sync::Arc;
use tracing::{info, instrument};

/// 缓存管理器
pub struct CacheManager {
    config: Config,
    store: Arc<dyn CacheStore>,
    pool: Arc<RebuildPool>,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("store", &self.store.name())
            .field("pool", &self.pool)
            .field("namespaces", &self.config.namespaces.len())
            .finish()
    }
}

impl CacheManager {
    /// 初始化缓存管理器
    ///
    /// 根据配置连接缓存存储并启动重建线程池
    ///
    /// # 参数
    ///
    /// * `config` - 配置
    ///
    /// # 返回值
    ///
    /// 配置无效或缓存存储不可用时返回错误
    #[instrument(skip(config), level = "info", fields(namespace_count = config.namespaces.len()))]
    pub async fn init(config: Config) -> Result<Self> {
        if let Err(e) = config.validate() {
            return Err(CacheError::ConfigError(e));
        }

        let store: Arc<dyn CacheStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new(config.store.memory.max_capacity)),
            StoreBackend::Redis => Arc::new(RedisStore::new(&config.store.redis).await?),
        };
        store.ping().await?;

        info!(
            "Initializing CacheManager with {} store and {} namespaces",
            store.name(),
            config.namespaces.len()
        );
        Self::with_store(config, store)
    }

    /// 使用已有的缓存存储构建管理器
    pub fn with_store(config: Config, store: Arc<dyn CacheStore>) -> Result<Self> {
        if let Err(e) = config.validate() {
            return Err(CacheError::ConfigError(e));
        }
        GLOBAL_METRICS.set_enabled(config.global.enable_metrics);
        let pool = Arc::new(RebuildPool::new("rebuild", &config.rebuild));
        Ok(Self {
            config,
            store,
            pool,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<RebuildPool> {
        &self.pool
    }

    /// 为键空间创建仓库，未配置的键空间使用默认配置
    pub fn repository<R: Record>(
        &self,
        namespace: &str,
        records: Arc<dyn RecordStore<R>>,
    ) -> CachedRepository<R> {
        CachedRepository::new(
            namespace,
            self.store.clone(),
            records,
            self.pool.clone(),
            self.config.namespace(namespace),
        )
    }

    /// 为键空间创建整表列表缓存
    pub fn list_cache<R: Record>(
        &self,
        namespace: &str,
        source: Arc<dyn ListSource<R>>,
    ) -> ListCache<R> {
        let config = self.config.namespace(namespace);
        ListCache::new(
            self.store.clone(),
            source,
            KeySpace::from_config(namespace, &config),
            &config,
        )
    }

    /// 关闭重建线程池
    #[instrument(skip(self), level = "info")]
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.shutdown().await
    }
}

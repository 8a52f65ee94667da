//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了集成测试的通用工具函数和夹具。

#![allow(dead_code)]

use cachewall::backend::{CacheStore, MemoryStore};
use cachewall::config::{NamespaceConfig, RebuildPoolConfig, ReadStrategy};
use cachewall::domain::Shop;
use cachewall::source::{InMemoryRecordStore, RecordStore};
use cachewall::sync::rebuild::RebuildPool;
use cachewall::CachedRepository;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 检查Redis是否可用
///
/// 读取 `REDIS_URL`，缺省为本地6379端口
pub async fn is_redis_available() -> bool {
    let url = redis_url();
    let Ok(client) = redis::Client::open(url.as_str()) else {
        return false;
    };
    let connect = client.get_multiplexed_async_connection();
    match tokio::time::timeout(Duration::from_secs(2), connect).await {
        Ok(Ok(mut conn)) => redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok(),
        _ => false,
    }
}

pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 生成唯一的键空间名称，保证测试之间互不干扰
pub fn unique_namespace(base: &str) -> String {
    format!("{}_{}", base, uuid::Uuid::new_v4().simple())
}

/// 测试夹具：内存缓存 + 内存数据源 + 仓库
pub struct Harness {
    pub cache: Arc<MemoryStore>,
    pub records: Arc<InMemoryRecordStore<Shop>>,
    pub pool: Arc<RebuildPool>,
    pub repository: CachedRepository<Shop>,
}

impl Harness {
    pub fn new(config: NamespaceConfig) -> Self {
        Self::with_records(config, Arc::new(InMemoryRecordStore::new()))
    }

    pub fn with_strategy(strategy: ReadStrategy) -> Self {
        Self::new(NamespaceConfig::with_strategy(strategy))
    }

    pub fn with_records(config: NamespaceConfig, records: Arc<InMemoryRecordStore<Shop>>) -> Self {
        setup_logging();
        let cache = Arc::new(MemoryStore::new(10_000));
        let pool = Arc::new(RebuildPool::new("test", &RebuildPoolConfig::default()));
        let repository = CachedRepository::new(
            "shop",
            cache.clone(),
            records.clone(),
            pool.clone(),
            config,
        );
        Self {
            cache,
            records,
            pool,
            repository,
        }
    }

    /// 使用任意数据源构建仓库（例如 mock）
    pub fn repository_over(
        config: NamespaceConfig,
        records: Arc<dyn RecordStore<Shop>>,
    ) -> (Arc<MemoryStore>, CachedRepository<Shop>) {
        setup_logging();
        let cache = Arc::new(MemoryStore::new(10_000));
        let pool = Arc::new(RebuildPool::new("test", &RebuildPoolConfig::default()));
        let repository = CachedRepository::new("shop", cache.clone(), records, pool, config);
        (cache, repository)
    }

    pub fn seed(&self, shops: impl IntoIterator<Item = Shop>) {
        for shop in shops {
            self.records.insert(shop).expect("seed shop must have an id");
        }
    }

    pub async fn cached_bytes(&self, id: i64) -> Option<Vec<u8>> {
        self.cache
            .get(&format!("cache:shop:{}", id))
            .await
            .expect("memory store never fails")
    }
}

pub fn shop(id: i64, name: &str) -> Shop {
    let mut shop = Shop::new(id, name);
    shop.address = format!("{}号", id);
    shop.avg_price = Some(80);
    shop
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 整表列表缓存的集成测试。

#[path = "../common/mod.rs"]
mod common;

use cachewall::backend::{CacheStore, MemoryStore};
use cachewall::config::NamespaceConfig;
use cachewall::domain::ShopType;
use cachewall::error::CacheError;
use cachewall::keys::KeySpace;
use cachewall::read::ListCache;
use cachewall::source::InMemoryRecordStore;
use std::sync::Arc;
use std::time::Duration;

fn list_cache(
    source: Arc<InMemoryRecordStore<ShopType>>,
) -> (Arc<MemoryStore>, ListCache<ShopType>) {
    common::setup_logging();
    let cache = Arc::new(MemoryStore::new(100));
    let config = NamespaceConfig::default();
    let list = ListCache::new(
        cache.clone(),
        source,
        KeySpace::from_config("shop-type", &config),
        &config,
    );
    (cache, list)
}

fn seeded() -> Arc<InMemoryRecordStore<ShopType>> {
    let source = Arc::new(InMemoryRecordStore::new());
    source.insert(ShopType::new(3, "KTV", 3)).unwrap();
    source.insert(ShopType::new(1, "美食", 1)).unwrap();
    source.insert(ShopType::new(2, "丽人", 2)).unwrap();
    source
}

#[tokio::test]
async fn test_list_is_sorted_and_cached() {
    let source = seeded();
    let (cache, list) = list_cache(source.clone());

    let first = list.query_list().await.unwrap();
    let sorts: Vec<i32> = first.iter().map(|t| t.sort).collect();
    assert_eq!(sorts, vec![1, 2, 3]);
    assert_eq!(source.list_calls(), 1);

    let second = list.query_list().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.list_calls(), 1);

    let ttl = cache.ttl("cache:shop-type").await.unwrap().unwrap();
    assert!(ttl > Duration::from_secs(1700) && ttl <= Duration::from_secs(1800));
}

#[tokio::test]
async fn test_empty_source_is_not_found_and_not_cached() {
    let source = Arc::new(InMemoryRecordStore::<ShopType>::new());
    let (cache, list) = list_cache(source.clone());

    let err = list.query_list().await.unwrap_err();
    assert!(matches!(err, CacheError::NotFound(ref msg) if msg == "record not found"));
    assert!(cache.get("cache:shop-type").await.unwrap().is_none());

    list.query_list().await.unwrap_err();
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_reload() {
    let source = seeded();
    let (_cache, list) = list_cache(source.clone());

    list.query_list().await.unwrap();
    source.insert(ShopType::new(4, "健身", 0)).unwrap();
    assert_eq!(list.query_list().await.unwrap().len(), 3);

    assert!(list.invalidate().await.unwrap());
    let reloaded = list.query_list().await.unwrap();
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded[0].name, "健身");
    assert_eq!(source.list_calls(), 2);
}

#[tokio::test]
async fn test_source_failure_is_surfaced() {
    let source = seeded();
    source.set_unavailable(true);
    let (cache, list) = list_cache(source);
    let err = list.query_list().await.unwrap_err();
    assert!(matches!(err, CacheError::StoreUnavailable(_)));
    assert!(cache.get("cache:shop-type").await.unwrap().is_none());
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 旁路缓存读取的集成测试：空值缓存防穿透和回源填充。

#[path = "../common/mod.rs"]
mod common;

use cachewall::backend::CacheStore;
use cachewall::config::{NamespaceConfig, ReadStrategy};
use cachewall::source::RecordStore;
use common::{shop, Harness};
use std::time::Duration;

#[tokio::test]
async fn test_absent_id_is_cached_as_null_marker() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);

    let first = h.repository.read_by_id(42).await;
    assert!(!first.success);
    assert_eq!(first.error_msg.as_deref(), Some("record not found"));
    assert_eq!(h.cached_bytes(42).await, Some(Vec::new()));

    let ttl = h.cache.ttl("cache:shop:42").await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(120));
    assert!(ttl > Duration::from_secs(110));

    let second = h.repository.read_by_id(42).await;
    assert!(!second.success);
    assert_eq!(h.records.get_calls(), 1);
}

#[tokio::test]
async fn test_null_marker_expires_and_store_is_queried_again() {
    let config = NamespaceConfig {
        null_ttl_secs: 1,
        ttl_secs: 60,
        ..NamespaceConfig::with_strategy(ReadStrategy::PassThrough)
    };
    let h = Harness::new(config);

    for _ in 0..5 {
        assert!(h.repository.get(42).await.unwrap().is_none());
    }
    assert_eq!(h.records.get_calls(), 1);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(h.repository.get(42).await.unwrap().is_none());
    assert_eq!(h.records.get_calls(), 2);
}

#[tokio::test]
async fn test_read_after_population_matches_store() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);
    h.seed([shop(1, "103茶餐厅"), shop(2, "蔡馬洪涛烤肉")]);

    for id in [1, 2] {
        let cached = h.repository.get(id).await.unwrap();
        let again = h.repository.get(id).await.unwrap();
        let direct = h.records.get(id).await.unwrap();
        assert_eq!(cached, direct);
        assert_eq!(again, direct);
    }
    // 每个id只回源一次，加上上面两次直接读取
    assert_eq!(h.records.get_calls(), 4);
}

#[tokio::test]
async fn test_record_created_after_null_marker_stays_hidden_until_expiry() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);
    assert!(h.repository.get(7).await.unwrap().is_none());

    h.seed([shop(7, "new")]);
    assert!(h.repository.get(7).await.unwrap().is_none());

    // 显式失效后立即可见
    h.repository.invalidate(7).await.unwrap();
    assert_eq!(h.repository.get(7).await.unwrap().unwrap().name, "new");
}

#[tokio::test]
async fn test_outcome_carries_record() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);
    h.seed([shop(3, "a")]);
    let outcome = h.repository.read_by_id(3).await;
    assert!(outcome.success);
    assert!(outcome.error_msg.is_none());
    assert_eq!(outcome.data.unwrap().name, "a");
}

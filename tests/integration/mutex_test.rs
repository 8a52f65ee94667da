//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 互斥锁重建策略的并发测试。

#[path = "../common/mod.rs"]
mod common;

use cachewall::backend::CacheStore;
use cachewall::config::{NamespaceConfig, ReadStrategy};
use cachewall::source::InMemoryRecordStore;
use common::{shop, Harness};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

fn slow_harness(latency: Duration) -> Arc<Harness> {
    let records = Arc::new(InMemoryRecordStore::with_latency(latency));
    Arc::new(Harness::with_records(
        NamespaceConfig::with_strategy(ReadStrategy::Mutex),
        records,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_reads_query_store_once() {
    let h = slow_harness(Duration::from_millis(200));
    h.seed([shop(1, "hot")]);

    let tasks = (0..50).map(|_| {
        let h = h.clone();
        tokio::spawn(async move { h.repository.get(1).await })
    });
    let results = join_all(tasks).await;

    for result in results {
        let shop = result.unwrap().unwrap().unwrap();
        assert_eq!(shop.name, "hot");
    }
    assert_eq!(h.records.get_calls(), 1);
    assert!(h.cache.get("lock:shop:1").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_of_absent_id_query_store_once() {
    let h = slow_harness(Duration::from_millis(100));

    let tasks = (0..20).map(|_| {
        let h = h.clone();
        tokio::spawn(async move { h.repository.get(404).await })
    });
    for result in join_all(tasks).await {
        assert!(result.unwrap().unwrap().is_none());
    }
    assert_eq!(h.records.get_calls(), 1);
}

#[tokio::test]
async fn test_hot_key_served_from_cache_after_rebuild() {
    let h = slow_harness(Duration::from_millis(20));
    h.seed([shop(5, "a")]);
    assert!(h.repository.get(5).await.unwrap().is_some());
    for _ in 0..10 {
        assert!(h.repository.get(5).await.unwrap().is_some());
    }
    assert_eq!(h.records.get_calls(), 1);
}

#[tokio::test]
async fn test_contention_is_reported_after_retry_budget() {
    let mut config = NamespaceConfig::with_strategy(ReadStrategy::Mutex);
    config.retry.max_attempts = 4;
    config.retry.base_delay_ms = 10;
    let h = Harness::new(config);
    h.seed([shop(8, "a")]);
    h.cache
        .set_if_absent("lock:shop:8", "stuck-holder", Duration::from_secs(30))
        .await
        .unwrap();

    let outcome = h.repository.read_by_id(8).await;
    assert!(!outcome.success);
    assert!(outcome.error_msg.unwrap().contains("after 4 attempts"));
    assert_eq!(h.records.get_calls(), 0);
}

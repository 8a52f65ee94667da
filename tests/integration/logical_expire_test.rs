//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 逻辑过期策略的集成测试：旧值窗口和单次重建。

#[path = "../common/mod.rs"]
mod common;

use cachewall::backend::CacheStore;
use cachewall::config::{NamespaceConfig, ReadStrategy};
use cachewall::domain::Shop;
use cachewall::envelope::LogicalEnvelope;
use cachewall::source::InMemoryRecordStore;
use chrono::Utc;
use common::{shop, Harness};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn put_expired_envelope(h: &Harness, record: Shop) {
    let id = record.id.unwrap();
    let envelope = LogicalEnvelope::with_expire_at(record, Utc::now() - chrono::Duration::seconds(5));
    h.cache
        .set(
            &format!("cache:shop:{}", id),
            serde_json::to_vec(&envelope).unwrap(),
            None,
        )
        .await
        .unwrap();
}

async fn read_envelope(h: &Harness, id: i64) -> Option<LogicalEnvelope<Shop>> {
    h.cached_bytes(id)
        .await
        .filter(|b| !b.is_empty())
        .map(|b| serde_json::from_slice(&b).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stale_value_served_without_store_latency() {
    let records = Arc::new(InMemoryRecordStore::with_latency(Duration::from_millis(300)));
    let h = Arc::new(Harness::with_records(
        NamespaceConfig::with_strategy(ReadStrategy::LogicalExpire),
        records,
    ));
    h.seed([shop(1, "new name")]);
    put_expired_envelope(&h, shop(1, "old name")).await;

    let tasks = (0..20).map(|_| {
        let h = h.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            let shop = h.repository.get(1).await.unwrap().unwrap();
            (shop, start.elapsed())
        })
    });
    for result in join_all(tasks).await {
        let (shop, elapsed) = result.unwrap();
        assert_eq!(shop.name, "old name");
        assert!(elapsed < Duration::from_millis(250), "stale read took {:?}", elapsed);
    }

    // 等待后台重建完成
    let mut rebuilt = None;
    for _ in 0..100 {
        if let Some(envelope) = read_envelope(&h, 1).await {
            if envelope.data.name == "new name" {
                rebuilt = Some(envelope);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let rebuilt = rebuilt.expect("envelope should be rebuilt");
    assert!(!rebuilt.is_expired());
    assert_eq!(h.records.get_calls(), 1);
    assert!(h.cache.get("lock:shop:1").await.unwrap().is_none());

    assert_eq!(h.repository.get(1).await.unwrap().unwrap().name, "new name");
}

#[tokio::test]
async fn test_fresh_envelope_does_not_touch_store() {
    let h = Harness::with_strategy(ReadStrategy::LogicalExpire);
    h.seed([shop(2, "a")]);
    assert!(h.repository.warm_up(2).await.unwrap());
    h.records.reset_counters();

    for _ in 0..10 {
        assert_eq!(h.repository.get(2).await.unwrap().unwrap().name, "a");
    }
    assert_eq!(h.records.get_calls(), 0);
    assert!(h.cache.ttl("cache:shop:2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_busy_lock_schedules_nothing() {
    let h = Harness::with_strategy(ReadStrategy::LogicalExpire);
    h.seed([shop(3, "new")]);
    put_expired_envelope(&h, shop(3, "old")).await;
    h.cache
        .set_if_absent("lock:shop:3", "other-instance", Duration::from_secs(30))
        .await
        .unwrap();

    assert_eq!(h.repository.get(3).await.unwrap().unwrap().name, "old");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.records.get_calls(), 0);
    assert_eq!(h.pool.stats().submitted.load(std::sync::atomic::Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_serving_stale_and_releases_lock() {
    let h = Harness::with_strategy(ReadStrategy::LogicalExpire);
    h.seed([shop(4, "new")]);
    put_expired_envelope(&h, shop(4, "old")).await;
    h.records.set_unavailable(true);

    assert_eq!(h.repository.get(4).await.unwrap().unwrap().name, "old");
    let mut released = false;
    for _ in 0..50 {
        if h.cache.get("lock:shop:4").await.unwrap().is_none() {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(released);

    // 下一个读到旧值的调用方重新尝试重建
    h.records.set_unavailable(false);
    assert_eq!(h.repository.get(4).await.unwrap().unwrap().name, "old");
    let mut rebuilt = false;
    for _ in 0..50 {
        if read_envelope(&h, 4).await.map(|e| e.data.name) == Some("new".to_string()) {
            rebuilt = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(rebuilt);
}

#[tokio::test]
async fn test_miss_loads_synchronously_by_default() {
    let h = Harness::with_strategy(ReadStrategy::LogicalExpire);
    h.seed([shop(5, "a")]);
    assert_eq!(h.repository.get(5).await.unwrap().unwrap().name, "a");
    assert!(read_envelope(&h, 5).await.is_some());

    assert!(h.repository.get(6).await.unwrap().is_none());
    assert_eq!(h.cached_bytes(6).await, Some(Vec::new()));
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 写路径的集成测试：先写数据源再删缓存。

#[path = "../common/mod.rs"]
mod common;

use cachewall::config::ReadStrategy;
use cachewall::domain::Shop;
use cachewall::source::RecordStore;
use common::{shop, Harness};

async fn update_then_read(strategy: ReadStrategy) {
    let h = Harness::with_strategy(strategy);
    h.seed([shop(1, "before")]);

    assert_eq!(h.repository.get(1).await.unwrap().unwrap().name, "before");
    assert!(h.cached_bytes(1).await.is_some());

    let mut changed = shop(1, "after");
    changed.avg_price = Some(120);
    let outcome = h.repository.update(&changed).await;
    assert!(outcome.success, "{:?}", outcome.error_msg);
    assert!(h.cached_bytes(1).await.is_none());

    let read = h.repository.get(1).await.unwrap().unwrap();
    assert_eq!(read, changed);
    assert_eq!(h.records.get(1).await.unwrap().unwrap(), changed);
}

#[tokio::test]
async fn test_update_then_read_pass_through() {
    update_then_read(ReadStrategy::PassThrough).await;
}

#[tokio::test]
async fn test_update_then_read_mutex() {
    update_then_read(ReadStrategy::Mutex).await;
}

#[tokio::test]
async fn test_update_then_read_logical_expire() {
    update_then_read(ReadStrategy::LogicalExpire).await;
}

#[tokio::test]
async fn test_update_without_id_is_rejected() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);
    let shop = Shop {
        id: None,
        name: "nameless".to_string(),
        ..Default::default()
    };
    let outcome = h.repository.update(&shop).await;
    assert!(!outcome.success);
    assert!(outcome.error_msg.unwrap().contains("id"));
    assert_eq!(h.records.update_calls(), 0);
}

#[tokio::test]
async fn test_update_of_unknown_record_keeps_cache() {
    let h = Harness::with_strategy(ReadStrategy::PassThrough);
    h.seed([shop(1, "a")]);
    h.repository.get(1).await.unwrap();

    let outcome = h.repository.update(&shop(99, "ghost")).await;
    assert!(!outcome.success);
    assert!(h.cached_bytes(1).await.is_some());
}

#[tokio::test]
async fn test_update_never_writes_cache_in_place() {
    let h = Harness::with_strategy(ReadStrategy::Mutex);
    h.seed([shop(2, "a")]);
    h.repository.update(&shop(2, "b")).await;
    assert!(h.cached_bytes(2).await.is_none());
}

//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! SeaORM SQLite 数据源测试

#[path = "../common/mod.rs"]
mod common;

use cachewall::config::{DatabaseConfig, NamespaceConfig, ReadStrategy};
use cachewall::domain::{Shop, ShopType};
use cachewall::error::CacheError;
use cachewall::keys::KeySpace;
use cachewall::read::ListCache;
use cachewall::source::database::{connect, SqlRecordStore};
use cachewall::source::{ListSource, RecordStore};
use cachewall::{CacheManager, Config, MemoryStore};
use common::shop;
use secrecy::SecretString;
use std::sync::Arc;
use tempfile::TempDir;

async fn sqlite_connection(dir: &TempDir) -> Arc<sea_orm::DatabaseConnection> {
    let path = dir.path().join("cachewall.db");
    let config = DatabaseConfig {
        url: SecretString::from(format!("sqlite://{}?mode=rwc", path.display())),
        max_connections: 1,
        connect_timeout_secs: 10,
    };
    Arc::new(connect(&config).await.expect("sqlite connection"))
}

async fn shop_store(dir: &TempDir) -> SqlRecordStore<Shop> {
    let store = SqlRecordStore::<Shop>::new(sqlite_connection(dir).await);
    store.ensure_schema().await.unwrap();
    store
}

#[tokio::test]
async fn test_sqlite_get_and_update() {
    let dir = TempDir::new().unwrap();
    let store = shop_store(&dir).await;
    store.ensure_schema().await.unwrap();

    let mut original = shop(1, "103茶餐厅");
    original.area = Some("大关".to_string());
    original.open_hours = Some("10:00-22:00".to_string());
    store.insert(&original).await.unwrap();

    assert_eq!(store.get(1).await.unwrap().unwrap(), original);
    assert!(store.get(2).await.unwrap().is_none());

    let mut changed = original.clone();
    changed.name = "103茶餐厅（新）".to_string();
    changed.avg_price = None;
    store.update(&changed).await.unwrap();
    assert_eq!(store.get(1).await.unwrap().unwrap(), changed);
}

#[tokio::test]
async fn test_sqlite_update_unknown_row_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = shop_store(&dir).await;
    let err = store.update(&shop(9, "ghost")).await.unwrap_err();
    assert!(matches!(err, CacheError::NotFound(_)));

    let nameless = Shop::default();
    let err = store.update(&nameless).await.unwrap_err();
    assert!(matches!(err, CacheError::InvalidRecord(_)));
}

#[tokio::test]
async fn test_sqlite_list_orders_by_sort_column() {
    let dir = TempDir::new().unwrap();
    let store = SqlRecordStore::<ShopType>::new(sqlite_connection(&dir).await);
    store.ensure_schema().await.unwrap();
    for shop_type in [
        ShopType::new(1, "KTV", 3),
        ShopType::new(2, "美食", 1),
        ShopType::new(3, "丽人", 2),
    ] {
        store.insert(&shop_type).await.unwrap();
    }

    let names: Vec<String> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["美食", "丽人", "KTV"]);

    let config = NamespaceConfig::default();
    let list = ListCache::new(
        Arc::new(MemoryStore::new(10)),
        Arc::new(store),
        KeySpace::from_config("shop-type", &config),
        &config,
    );
    assert_eq!(list.query_list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_repository_over_sqlite_store() {
    common::setup_logging();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(shop_store(&dir).await);
    store.insert(&shop(1, "before")).await.unwrap();

    let mut config = Config::default();
    config.namespaces.insert(
        "shop".to_string(),
        NamespaceConfig::with_strategy(ReadStrategy::Mutex),
    );
    let manager = CacheManager::with_store(config, Arc::new(MemoryStore::new(100))).unwrap();
    let repository = manager.repository::<Shop>("shop", store.clone());

    assert_eq!(repository.get(1).await.unwrap().unwrap().name, "before");
    assert!(repository.get(404).await.unwrap().is_none());

    let outcome = repository.update(&shop(1, "after")).await;
    assert!(outcome.success);
    assert_eq!(repository.get(1).await.unwrap().unwrap().name, "after");

    manager.shutdown().await.unwrap();
}

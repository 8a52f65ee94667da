//! cachewall - 缓存一致性核心
//!
//! 在 Redis 或进程内 moka 缓存之上，提供旁路缓存读取（空值缓存防穿透）、
//! 互斥锁重建和逻辑过期（防击穿）三种读策略，以及"先写库再删缓存"的写路径。

#![doc(html_root_url = "https://docs.rs/cachewall/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod config;
pub mod domain;
pub mod dto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod lock;
pub mod manager;
pub mod metrics;
pub mod read;
pub mod repository;
pub mod serialization;
pub mod source;
pub mod sync;
pub mod telemetry;

// Re-export commonly used items
pub use backend::{CacheStore, MemoryStore, RedisStore};
pub use config::{Config, NamespaceConfig, ReadStrategy, ReleaseMode, RetryPolicy};
pub use domain::{Record, Shop, ShopType};
pub use dto::Outcome;
pub use error::{CacheError, Result};
pub use manager::CacheManager;
pub use repository::CachedRepository;
pub use source::{InMemoryRecordStore, ListSource, RecordStore};
pub use sync::warmup::{WarmupManager, WarmupResult, WarmupStatus};

/// cachewall 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

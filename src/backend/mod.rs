//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存存储后端：带逐键TTL和原子"不存在才写入"原语的键值存储。

pub mod memory;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// 缓存存储特征
///
/// 读策略和分布式锁只依赖这组原语，因此与具体存储无关
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 获取缓存值，`None` 表示键不存在
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 设置缓存值
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `value` - 缓存值，空字节数组是合法值（用作空值标记）
    /// * `ttl` - 物理过期时间，`None` 表示永不过期
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// 删除缓存项，返回键是否存在
    async fn delete(&self, key: &str) -> Result<bool>;

    /// 仅当键不存在时写入，返回是否写入成功
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// 重新设置键的过期时间，键不存在时返回 false
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// 仅当当前值等于 `expected` 时删除（比较并删除）
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool>;

    /// 获取剩余生存时间，键不存在或无过期时间时返回 None
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// 检查存储是否可用
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// 后端名称，用于日志和指标
    fn name(&self) -> &'static str;
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了权威数据源接口。
//!
//! 缓存一致性核心只通过这组窄接口访问数据源，读取和更新的具体实现
//! 可以是内存表，也可以是 SeaORM 连接的关系数据库。

pub mod database;
pub mod memory;

use crate::domain::Record;
use crate::error::Result;
use async_trait::async_trait;

pub use self::database::{SqlRecord, SqlRecordStore};
pub use self::memory::InMemoryRecordStore;

/// 权威数据源特征
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// 按id读取记录，不存在时返回 `None`
    async fn get(&self, id: i64) -> Result<Option<R>>;

    /// 按id更新记录
    ///
    /// 记录必须带id；数据源中不存在该id时返回 `CacheError::NotFound`
    async fn update(&self, record: &R) -> Result<()>;
}

/// 整表列表数据源
#[async_trait]
pub trait ListSource<R: Record>: Send + Sync {
    /// 返回全部记录，按 `Record::sort_key` 升序
    async fn list_all(&self) -> Result<Vec<R>>;
}

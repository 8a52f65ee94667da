//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了互斥锁重建策略，防止热点键过期时的缓存击穿。

use super::pass_through::{CacheAsideReader, Probe};
use super::load_under_mutex;
use crate::config::{NamespaceConfig, RetryPolicy};
use crate::domain::Record;
use crate::error::{CacheError, Result};
use crate::lock::DistributedLock;
use std::sync::Arc;
use tracing::instrument;

/// 互斥锁重建策略
///
/// 同一时刻只有持锁者回源，其余调用方按重试策略等待缓存被填充。
/// 不会返回过期数据。
pub struct MutexRebuild<R: Record> {
    reader: Arc<CacheAsideReader<R>>,
    lock: DistributedLock,
    retry: RetryPolicy,
}

impl<R: Record> std::fmt::Debug for MutexRebuild<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexRebuild")
            .field("reader", &self.reader)
            .field("lock", &self.lock)
            .field("retry", &self.retry)
            .finish()
    }
}

impl<R: Record> MutexRebuild<R> {
    pub fn new(
        reader: Arc<CacheAsideReader<R>>,
        lock: DistributedLock,
        config: &NamespaceConfig,
    ) -> Self {
        Self {
            reader,
            lock,
            retry: config.retry.clone(),
        }
    }

    /// 带互斥锁的读取
    ///
    /// # 返回值
    ///
    /// `Ok(None)` 表示记录不存在；重试耗尽时返回 `CacheError::LockContention`
    #[instrument(skip(self), level = "debug", fields(namespace = %self.reader.keys().namespace()))]
    pub async fn query_with_mutex(&self, id: i64) -> Result<Option<R>> {
        let reader = &self.reader;
        let lock_key = reader.keys().lock_key(id);

        load_under_mutex(
            &self.lock,
            &lock_key,
            reader.keys().namespace(),
            &self.retry,
            move || async move {
                Ok::<_, CacheError>(match reader.probe(id).await? {
                    Probe::Hit(record) => Some(Some(record)),
                    Probe::Negative => Some(None),
                    Probe::Miss => None,
                })
            },
            move || reader.load_and_fill(id),
        )
        .await
    }
}

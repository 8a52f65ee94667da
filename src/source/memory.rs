//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 DashMap 的内存数据源，用于演示和测试。

use super::{ListSource, RecordStore};
use crate::domain::Record;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

/// 内存数据源
///
/// 统计每类查询的调用次数，并可模拟查询延迟和不可用
pub struct InMemoryRecordStore<R> {
    records: DashMap<i64, R>,
    get_calls: AtomicU64,
    update_calls: AtomicU64,
    list_calls: AtomicU64,
    latency: Option<Duration>,
    unavailable: AtomicBool,
}

impl<R: Record> std::fmt::Debug for InMemoryRecordStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("records", &self.records.len())
            .field("get_calls", &self.get_calls())
            .field("latency", &self.latency)
            .finish()
    }
}

impl<R: Record> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> InMemoryRecordStore<R> {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            get_calls: AtomicU64::new(0),
            update_calls: AtomicU64::new(0),
            list_calls: AtomicU64::new(0),
            latency: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// 每次查询前等待 `latency`，模拟慢速数据库
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::new()
        }
    }

    /// 写入记录（不计入调用次数）
    pub fn insert(&self, record: R) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| CacheError::InvalidRecord("record id must be set".to_string()))?;
        self.records.insert(id, record);
        Ok(())
    }

    pub fn remove(&self, id: i64) -> Option<R> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `get` 被调用的次数
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.get_calls.store(0, Ordering::SeqCst);
        self.update_calls.store(0, Ordering::SeqCst);
        self.list_calls.store(0, Ordering::SeqCst);
    }

    /// 模拟数据源不可用
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    async fn before_query(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable(
                "in-memory record store is marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryRecordStore<R> {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, id: i64) -> Result<Option<R>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.before_query().await?;
        let record = self.records.get(&id).map(|r| r.value().clone());
        debug!("In-memory store get: id={}, found={}", id, record.is_some());
        Ok(record)
    }

    #[instrument(skip(self, record), level = "debug")]
    async fn update(&self, record: &R) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.before_query().await?;
        let id = record
            .id()
            .ok_or_else(|| CacheError::InvalidRecord("record id must be set".to_string()))?;
        match self.records.get_mut(&id) {
            Some(mut slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(CacheError::NotFound(format!("record {} does not exist", id))),
        }
    }
}

#[async_trait]
impl<R: Record> ListSource<R> for InMemoryRecordStore<R> {
    async fn list_all(&self) -> Result<Vec<R>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.before_query().await?;
        let mut all: Vec<R> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|r| (r.sort_key(), r.id()));
        Ok(all)
    }
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了按配置的id列表分批预热缓存的管理器。

use crate::config::WarmupConfig;
use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct WarmupManager {
    namespace: String,
    config: WarmupConfig,
    status: Arc<RwLock<WarmupStatus>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WarmupStatus {
    Pending,
    InProgress { progress: usize, total: usize },
    Completed { loaded: usize, failed: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarmupResult {
    pub loaded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success: bool,
}

impl WarmupResult {
    pub fn skipped(count: usize) -> Self {
        Self {
            loaded: 0,
            failed: 0,
            skipped: count,
            success: true,
        }
    }

    pub fn failed(failed: usize) -> Self {
        Self {
            loaded: 0,
            failed,
            skipped: 0,
            success: false,
        }
    }
}

impl WarmupManager {
    pub fn new(namespace: impl Into<String>, config: WarmupConfig) -> Self {
        Self {
            namespace: namespace.into(),
            config,
            status: Arc::new(RwLock::new(WarmupStatus::Pending)),
        }
    }

    pub fn config(&self) -> &WarmupConfig {
        &self.config
    }

    /// 执行预热
    ///
    /// `load_fn` 接收一批id，返回其中成功写入缓存的数量；
    /// 未写入的id（包括数据源中不存在的）计为失败
    pub async fn run_warmup<F, Fut>(&self, load_fn: F) -> Result<WarmupResult>
    where
        F: Fn(Vec<i64>) -> Fut + Send,
        Fut: Future<Output = Result<usize>> + Send,
    {
        info!(
            "Starting cache warmup for namespace: {}, enabled: {}, ids: {}",
            self.namespace,
            self.config.enabled,
            self.config.ids.len()
        );

        if !self.config.enabled {
            info!("Cache warmup is disabled, skipping");
            return Ok(WarmupResult::skipped(self.config.ids.len()));
        }

        let timeout = tokio::time::Duration::from_secs(self.config.timeout_seconds);
        let result = tokio::time::timeout(timeout, self.warmup_inner(load_fn)).await;

        match result {
            Ok(Ok(result)) => {
                info!(
                    "Cache warmup completed: loaded={}, failed={}, skipped={}",
                    result.loaded, result.failed, result.skipped
                );
                *self.status.write().await = WarmupStatus::Completed {
                    loaded: result.loaded,
                    failed: result.failed,
                };
                Ok(result)
            }
            Ok(Err(e)) => {
                warn!("Cache warmup failed: {}", e);
                *self.status.write().await = WarmupStatus::Failed {
                    error: e.to_string(),
                };
                Ok(WarmupResult::failed(self.config.ids.len()))
            }
            Err(_) => {
                warn!(
                    "Cache warmup timed out after {} seconds",
                    self.config.timeout_seconds
                );
                *self.status.write().await = WarmupStatus::Failed {
                    error: "timeout".to_string(),
                };
                Ok(WarmupResult::failed(self.config.ids.len()))
            }
        }
    }

    async fn warmup_inner<F, Fut>(&self, load_fn: F) -> Result<WarmupResult>
    where
        F: Fn(Vec<i64>) -> Fut + Send,
        Fut: Future<Output = Result<usize>> + Send,
    {
        let mut total_loaded = 0usize;
        let mut total_failed = 0usize;
        let total = self.config.ids.len();
        let batch_size = self.config.batch_size.max(1);
        let interval_ms = self.config.batch_interval_ms;

        for chunk in self.config.ids.chunks(batch_size) {
            match load_fn(chunk.to_vec()).await {
                Ok(loaded) => {
                    let loaded = loaded.min(chunk.len());
                    total_loaded = total_loaded.saturating_add(loaded);
                    total_failed = total_failed.saturating_add(chunk.len() - loaded);
                }
                Err(e) => {
                    warn!("Failed to load warmup batch: {}", e);
                    total_failed = total_failed.saturating_add(chunk.len());
                }
            }

            let progress = total_loaded + total_failed;
            debug!("Warmup progress: {}/{}", progress, total);
            *self.status.write().await = WarmupStatus::InProgress { progress, total };

            if interval_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
            }
        }

        Ok(WarmupResult {
            loaded: total_loaded,
            failed: total_failed,
            skipped: 0,
            success: total_failed == 0,
        })
    }

    pub async fn get_status(&self) -> WarmupStatus {
        self.status.read().await.clone()
    }
}

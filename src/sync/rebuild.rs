//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后台缓存重建线程池。
//!
//! 固定数量的工作者从有界队列中取任务执行；提交从不等待，队列满时直接拒绝。
//! 关闭时队列中已接受的任务仍会执行。

use crate::config::RebuildPoolConfig;
use crate::error::{CacheError, Result};
use crate::metrics::GLOBAL_METRICS;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 重建任务
pub type RebuildJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 重建线程池统计
#[derive(Debug, Default)]
pub struct RebuildStats {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub completed: AtomicU64,
    pub panicked: AtomicU64,
}

/// 重建线程池
pub struct RebuildPool {
    name: String,
    sender: mpsc::Sender<RebuildJob>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
    stats: Arc<RebuildStats>,
    capacity: usize,
}

impl std::fmt::Debug for RebuildPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildPool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("queued", &self.queued())
            .field("stats", &self.stats)
            .finish()
    }
}

impl RebuildPool {
    /// 创建并启动重建线程池
    ///
    /// 必须在 tokio 运行时中调用
    pub fn new(name: impl Into<String>, config: &RebuildPoolConfig) -> Self {
        let name = name.into();
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel::<RebuildJob>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let stats = Arc::new(RebuildStats::default());

        let handles = (0..workers)
            .map(|index| {
                let receiver = receiver.clone();
                let shutdown = shutdown.clone();
                let stats = stats.clone();
                let name = name.clone();
                tokio::spawn(async move {
                    Self::worker_loop(index, name, receiver, shutdown, stats).await;
                })
            })
            .collect();

        info!(
            "Rebuild pool '{}' started: workers={}, queue_capacity={}",
            name, workers, capacity
        );

        Self {
            name,
            sender,
            workers: std::sync::Mutex::new(handles),
            shutdown,
            stats,
            capacity,
        }
    }

    async fn worker_loop(
        index: usize,
        name: String,
        receiver: Arc<Mutex<mpsc::Receiver<RebuildJob>>>,
        shutdown: CancellationToken,
        stats: Arc<RebuildStats>,
    ) {
        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                job = async {
                    let mut receiver = receiver.lock().await;
                    let job = receiver.recv().await;
                    GLOBAL_METRICS.set_rebuild_queue_depth(&name, receiver.len());
                    job
                } => job,
            };
            let Some(job) = job else { break };
            Self::run_job(index, &name, &stats, job).await;
        }

        // 排队的任务持有重建锁，必须执行完才能释放
        loop {
            let job = {
                let mut receiver = receiver.lock().await;
                receiver.close();
                let job = receiver.try_recv().ok();
                GLOBAL_METRICS.set_rebuild_queue_depth(&name, receiver.len());
                job
            };
            let Some(job) = job else { break };
            Self::run_job(index, &name, &stats, job).await;
        }
        debug!("Rebuild worker {} of '{}' stopped", index, name);
    }

    async fn run_job(index: usize, name: &str, stats: &RebuildStats, job: RebuildJob) {
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            warn!("Rebuild job panicked on worker {} of '{}'", index, name);
            stats.panicked.fetch_add(1, Ordering::Relaxed);
        }
        stats.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// 提交重建任务，不等待
    ///
    /// 队列已满时返回 `CacheError::PoolSaturated`，线程池已关闭时返回
    /// `CacheError::ShutdownError`
    pub fn try_submit<F>(&self, job: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(CacheError::ShutdownError(format!(
                "rebuild pool '{}' is shut down",
                self.name
            )));
        }
        match self.sender.try_send(Box::pin(job)) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                GLOBAL_METRICS.set_rebuild_queue_depth(&self.name, self.queued());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                Err(CacheError::PoolSaturated(format!(
                    "rebuild pool '{}' queue is full ({})",
                    self.name, self.capacity
                )))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(CacheError::ShutdownError(
                format!("rebuild pool '{}' is closed", self.name),
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前排队中的任务数
    pub fn queued(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn stats(&self) -> &RebuildStats {
        &self.stats
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// 关闭线程池
    ///
    /// 不再接受新任务；正在执行和已排队的任务都会执行完后才返回
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        let handles: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for handle in handles {
            if let Err(e) = handle.await {
                return Err(CacheError::ShutdownError(format!(
                    "rebuild worker of '{}' failed: {}",
                    self.name, e
                )));
            }
        }
        GLOBAL_METRICS.set_rebuild_queue_depth(&self.name, 0);
        info!("Rebuild pool '{}' shut down", self.name);
        Ok(())
    }
}

impl Drop for RebuildPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

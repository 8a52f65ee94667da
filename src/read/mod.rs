//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存读策略：旁路缓存、互斥锁重建和逻辑过期，以及整表列表缓存。

pub mod list;
pub mod logical_expire;
pub mod mutex;
pub mod pass_through;

use crate::config::RetryPolicy;
use crate::error::{CacheError, Result};
use crate::lock::DistributedLock;
use crate::metrics::GLOBAL_METRICS;
use std::future::Future;
use tracing::debug;

pub use self::list::ListCache;
pub use self::logical_expire::LogicalExpire;
pub use self::mutex::MutexRebuild;
pub use self::pass_through::{CacheAsideReader, Probe};

/// 互斥加载协议
///
/// 1. `probe` 探测缓存，返回 `Some` 即直接作为结果；
/// 2. 未命中时尝试加锁，失败则按重试策略等待后回到第1步；
/// 3. 加锁成功后再探测一次，仍未命中才执行 `load`；
/// 4. 无论 `load` 成功、失败还是panic，锁都会被释放。
///
/// 重试次数耗尽时返回 `CacheError::LockContention`。
pub(crate) async fn load_under_mutex<T, P, PF, L, LF>(
    lock: &DistributedLock,
    lock_key: &str,
    namespace: &str,
    retry: &RetryPolicy,
    probe: P,
    load: L,
) -> Result<T>
where
    P: Fn() -> PF,
    PF: Future<Output = Result<Option<T>>>,
    L: FnOnce() -> LF,
    LF: Future<Output = Result<T>>,
{
    for attempt in 0..retry.max_attempts {
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        if let Some(token) = lock.try_acquire(lock_key).await? {
            return lock
                .run_then_release(&token, async {
                    // 上一个持有者可能刚刚写回缓存
                    if let Some(value) = probe().await? {
                        debug!("Cache filled by previous lock holder: {}", lock_key);
                        return Ok(value);
                    }
                    load().await
                })
                .await;
        }

        GLOBAL_METRICS.record_request(namespace, "lock", "wait", "retry");
        if attempt + 1 < retry.max_attempts {
            tokio::time::sleep(retry.delay(attempt)).await;
        }
    }

    GLOBAL_METRICS.record_request(namespace, "lock", "wait", "exhausted");
    Err(CacheError::LockContention {
        key: lock_key.to_string(),
        attempts: retry.max_attempts,
    })
}

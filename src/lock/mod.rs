//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于缓存存储的非阻塞分布式锁。
//!
//! 加锁是一次带TTL的"不存在才写入"，锁值为随机的持有者令牌；
//! 持有者崩溃时锁在TTL到期后自动释放。锁不可重入。

use crate::backend::CacheStore;
use crate::config::ReleaseMode;
use crate::error::Result;
use crate::metrics::GLOBAL_METRICS;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// 锁令牌
///
/// 只有成功执行条件写入的调用方才会拿到令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    key: String,
    owner: String,
}

impl LockToken {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// 分布式锁
#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<dyn CacheStore>,
    namespace: String,
    ttl: Duration,
    mode: ReleaseMode,
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("store", &self.store.name())
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("mode", &self.mode)
            .finish()
    }
}

impl DistributedLock {
    /// 创建分布式锁
    ///
    /// # 参数
    ///
    /// * `store` - 存放锁键的缓存存储
    /// * `namespace` - 键空间名称，用于日志和指标
    /// * `ttl` - 锁的物理过期时间
    /// * `mode` - 释放模式
    pub fn new(
        store: Arc<dyn CacheStore>,
        namespace: impl Into<String>,
        ttl: Duration,
        mode: ReleaseMode,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            ttl,
            mode,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mode(&self) -> ReleaseMode {
        self.mode
    }

    /// 尝试获取锁，不等待
    ///
    /// 返回 `Some(token)` 当且仅当调用方现在持有锁
    #[instrument(skip(self), level = "debug", fields(namespace = %self.namespace))]
    pub async fn try_acquire(&self, key: &str) -> Result<Option<LockToken>> {
        let owner = Uuid::new_v4().to_string();
        let acquired = self.store.set_if_absent(key, &owner, self.ttl).await?;
        GLOBAL_METRICS.record_request(
            &self.namespace,
            "lock",
            "acquire",
            if acquired { "acquired" } else { "busy" },
        );
        if acquired {
            debug!("Lock acquired: key={}", key);
            Ok(Some(LockToken {
                key: key.to_string(),
                owner,
            }))
        } else {
            Ok(None)
        }
    }

    /// 释放锁
    ///
    /// 锁已过期或已被他人持有时返回 `Ok(false)`，不会报错
    #[instrument(skip(self, token), level = "debug", fields(namespace = %self.namespace, key = %token.key))]
    pub async fn release(&self, token: &LockToken) -> Result<bool> {
        let released = match self.mode {
            ReleaseMode::OwnerChecked => {
                self.store
                    .delete_if_equals(&token.key, &token.owner)
                    .await?
            }
            ReleaseMode::Unchecked => self.store.delete(&token.key).await?,
        };
        if !released {
            debug!(
                "Lock {} was no longer held by this owner at release",
                token.key
            );
        }
        GLOBAL_METRICS.record_request(
            &self.namespace,
            "lock",
            "release",
            if released { "released" } else { "gone" },
        );
        Ok(released)
    }

    /// 释放锁，失败时仅记录日志
    ///
    /// 用于收尾路径，锁最终会由TTL兜底
    pub async fn release_quietly(&self, token: &LockToken) {
        if let Err(e) = self.release(token).await {
            warn!(
                "Failed to release lock {}: {}, it will expire in {:?}",
                token.key, e, self.ttl
            );
        }
    }

    /// 在持有锁的情况下执行 `fut`，无论成功、失败还是panic都会释放锁
    ///
    /// panic 会在释放锁之后继续向上传播
    pub async fn run_then_release<T, Fut>(&self, token: &LockToken, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let outcome = AssertUnwindSafe(fut).catch_unwind().await;
        self.release_quietly(token).await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

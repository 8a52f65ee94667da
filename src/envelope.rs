//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了逻辑过期策略使用的数据信封。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 逻辑过期信封
///
/// 信封本身不设物理TTL，是否过期只由 `expire_at` 与当前时间比较决定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalEnvelope<R> {
    pub data: R,
    #[serde(rename = "expireTime")]
    pub expire_at: DateTime<Utc>,
}

impl<R> LogicalEnvelope<R> {
    /// 以当前时间加上 `ttl` 作为逻辑过期时间
    pub fn new(data: R, ttl: Duration) -> Self {
        Self {
            data,
            expire_at: deadline(Utc::now(), ttl),
        }
    }

    pub fn with_expire_at(data: R, expire_at: DateTime<Utc>) -> Self {
        Self { data, expire_at }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn into_data(self) -> R {
        self.data
    }
}

fn deadline(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

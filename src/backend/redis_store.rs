//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存存储实现。

use super::CacheStore;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, RedisResult};
use secrecy::ExposeSecret;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

const COMPARE_AND_DELETE: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Redis缓存存储
///
/// 单机模式，通过 ConnectionManager 自动重连；每条命令都受命令超时约束
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    manager: ConnectionManager,
    compare_and_delete: redis::Script,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish()
    }
}

impl RedisStore {
    /// 创建新的Redis缓存存储
    ///
    /// # 参数
    ///
    /// * `config` - Redis配置
    ///
    /// # 返回值
    ///
    /// 连接在超时时间内建立成功时返回实例
    #[instrument(skip(config), level = "info", name = "init_redis_store")]
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.connection_string.expose_secret()).map_err(|e| {
            CacheError::ConfigError(format!("Invalid redis connection string: {}", e))
        })?;

        let manager = tokio::time::timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        .map_err(|_| {
            CacheError::Timeout(format!(
                "redis connection not established within {}ms",
                config.connection_timeout_ms
            ))
        })??;

        debug!("Redis store connected");
        Ok(Self {
            client,
            manager,
            compare_and_delete: redis::Script::new(COMPARE_AND_DELETE),
            command_timeout_ms: config.command_timeout_ms,
        })
    }

    /// 获取原始Redis客户端
    pub fn raw_client(&self) -> &Client {
        &self.client
    }

    /// 获取命令超时时间（毫秒）
    pub fn command_timeout_ms(&self) -> u64 {
        self.command_timeout_ms
    }

    async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(Duration::from_millis(self.command_timeout_ms), fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(format!(
                "redis {} timed out after {}ms",
                op, self.command_timeout_ms
            ))),
        }
    }
}

fn millis(ttl: Duration) -> u64 {
    // PX 不接受0
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("GET", cmd.query_async(&mut conn)).await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(millis(ttl));
        }
        self.run("SET", cmd.query_async::<()>(&mut conn)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.run("DEL", cmd.query_async(&mut conn)).await?;
        Ok(removed > 0)
    }

    /// 使用 SET NX PX 实现
    #[instrument(skip(self, value), level = "debug")]
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("PX").arg(millis(ttl));
        let result: Option<String> = self.run("SET NX", cmd.query_async(&mut conn)).await?;
        debug!(
            "Redis set_if_absent: key={}, acquired={}",
            key,
            result.is_some()
        );
        Ok(result.is_some())
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("PEXPIRE");
        cmd.arg(key).arg(millis(ttl));
        self.run("PEXPIRE", cmd.query_async(&mut conn)).await
    }

    /// 使用 Lua 脚本保证比较和删除的原子性
    #[instrument(skip(self, expected), level = "debug")]
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let mut invocation = self.compare_and_delete.prepare_invoke();
        invocation.key(key).arg(expected);
        let removed: i64 = self
            .run("compare-and-delete", invocation.invoke_async(&mut conn))
            .await?;
        Ok(removed == 1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("PTTL");
        cmd.arg(key);
        let ttl_ms: i64 = self.run("PTTL", cmd.query_async(&mut conn)).await?;
        // -2: 键不存在, -1: 无过期时间
        if ttl_ms >= 0 {
            Ok(Some(Duration::from_millis(ttl_ms as u64)))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let cmd = redis::cmd("PING");
        let _: String = self.run("PING", cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存一致性核心的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_VERSION_FIELD: &str = "config_version";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub rebuild: RebuildPoolConfig,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceConfig>,
}

/// 全局配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GlobalConfig {
    /// tracing 过滤表达式，例如 "info,cachewall=debug"
    pub log_filter: String,
    /// 是否启用指标收集
    pub enable_metrics: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            enable_metrics: true,
        }
    }
}

/// 缓存存储后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内 moka 缓存
    #[default]
    Memory,
    /// Redis
    Redis,
}

/// 缓存存储配置
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub memory: MemoryConfig,
    pub redis: RedisConfig,
}

/// 内存缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MemoryConfig {
    /// 最大条目数
    pub max_capacity: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

/// Redis配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::from("redis://127.0.0.1:6379".to_string()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
        }
    }
}

/// 权威数据库配置
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    /// 数据库连接串（postgres:// mysql:// sqlite:）
    pub url: SecretString,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// 重建线程池配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RebuildPoolConfig {
    /// 固定的工作者数量
    pub workers: usize,
    /// 有界队列容量，超出后拒绝提交
    pub queue_capacity: usize,
}

impl Default for RebuildPoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 64,
        }
    }
}

/// 读策略
///
/// 每个键空间只能选择一种策略
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// 旁路缓存 + 空值缓存（防穿透）
    #[default]
    PassThrough,
    /// 互斥锁重建（防击穿，严格不读旧值）
    Mutex,
    /// 逻辑过期（防击穿，容忍短暂旧值）
    LogicalExpire,
}

/// 锁释放模式
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseMode {
    /// 仅当锁值与持有者令牌一致时删除
    #[default]
    OwnerChecked,
    /// 无条件删除锁键
    Unchecked,
}

/// 退避方式
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

/// 互斥策略的有界重试配置
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最大尝试次数（包含第一次）
    pub max_attempts: u32,
    /// 基础等待时间（毫秒）
    pub base_delay_ms: u64,
    /// 退避方式
    pub backoff: Backoff,
    /// 指数退避的上限（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            base_delay_ms: 50,
            backoff: Backoff::Fixed,
            max_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次（从0开始）失败后的等待时间
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Fixed => self.base_delay_ms,
            Backoff::Exponential => {
                let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
                self.base_delay_ms
                    .saturating_mul(factor)
                    .min(self.max_delay_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

/// 键空间配置
///
/// 定义某一类记录（例如店铺）的缓存行为
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct NamespaceConfig {
    /// 读策略
    pub strategy: ReadStrategy,
    /// 缓存键前缀，缺省为 `cache:<namespace>:`
    pub key_prefix: Option<String>,
    /// 锁键前缀，缺省为 `lock:<namespace>:`
    pub lock_prefix: Option<String>,
    /// 正常值的物理TTL（秒）
    pub ttl_secs: u64,
    /// 空值缓存的物理TTL（秒），必须短于 `ttl_secs`
    pub null_ttl_secs: u64,
    /// 锁的物理TTL（秒）
    pub lock_ttl_secs: u64,
    /// 逻辑过期时长（秒）
    pub logical_ttl_secs: u64,
    /// 逻辑过期策略下，缓存缺失时是否同步回源
    pub load_on_miss: bool,
    /// 锁释放模式
    pub release_mode: ReleaseMode,
    /// 互斥策略的重试配置
    pub retry: RetryPolicy,
    /// 记录不存在时返回给调用方的信息
    pub not_found_message: String,
    /// 启动预热
    pub warmup: WarmupConfig,
}

/// 预热配置
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct WarmupConfig {
    pub enabled: bool,
    /// 需要预热的记录id
    pub ids: Vec<i64>,
    /// 每批数量
    pub batch_size: usize,
    /// 批次间隔（毫秒）
    pub batch_interval_ms: u64,
    /// 整体超时（秒）
    pub timeout_seconds: u64,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ids: Vec::new(),
            batch_size: 100,
            batch_interval_ms: 0,
            timeout_seconds: 60,
        }
    }
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            strategy: ReadStrategy::PassThrough,
            key_prefix: None,
            lock_prefix: None,
            ttl_secs: 30 * 60,
            null_ttl_secs: 2 * 60,
            lock_ttl_secs: 10 * 60,
            logical_ttl_secs: 20,
            load_on_miss: true,
            release_mode: ReleaseMode::OwnerChecked,
            retry: RetryPolicy::default(),
            not_found_message: "record not found".to_string(),
            warmup: WarmupConfig::default(),
        }
    }
}

impl NamespaceConfig {
    pub fn with_strategy(strategy: ReadStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn null_ttl(&self) -> Duration {
        Duration::from_secs(self.null_ttl_secs)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn logical_ttl(&self) -> Duration {
        Duration::from_secs(self.logical_ttl_secs)
    }
}

impl Config {
    /// 从TOML文本解析并验证配置
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| CacheError::ConfigError(e.to_string()))?;
        config.validate().map_err(CacheError::ConfigError)?;
        Ok(config)
    }

    /// 从TOML文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// 获取键空间配置，未配置时使用默认值
    pub fn namespace(&self, name: &str) -> NamespaceConfig {
        self.namespaces.get(name).cloned().unwrap_or_default()
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.store.memory.max_capacity == 0 {
            return Err("store.memory.max_capacity cannot be zero".to_string());
        }

        if self.store.backend == StoreBackend::Redis {
            let timeout = self.store.redis.connection_timeout_ms;
            if !(100..=30000).contains(&timeout) {
                return Err(
                    "store.redis.connection_timeout_ms must be between 100 and 30000 ms"
                        .to_string(),
                );
            }
            let timeout = self.store.redis.command_timeout_ms;
            if !(100..=60000).contains(&timeout) {
                return Err(
                    "store.redis.command_timeout_ms must be between 100 and 60000 ms".to_string(),
                );
            }
        }

        if self.rebuild.workers == 0 || self.rebuild.workers > 256 {
            return Err("rebuild.workers must be between 1 and 256".to_string());
        }

        if self.rebuild.queue_capacity == 0 {
            return Err("rebuild.queue_capacity cannot be zero".to_string());
        }

        for (name, ns) in &self.namespaces {
            if name.is_empty() {
                return Err("Namespace name cannot be empty".to_string());
            }

            if name.len() > 64 {
                return Err(format!(
                    "Namespace '{}' exceeds maximum length of 64 characters",
                    name
                ));
            }

            if ns.ttl_secs == 0 {
                return Err(format!("Namespace '{}' ttl_secs cannot be zero", name));
            }

            if ns.ttl_secs > 86400 * 30 {
                return Err(format!("Namespace '{}' ttl_secs cannot exceed 30 days", name));
            }

            if ns.null_ttl_secs == 0 || ns.null_ttl_secs >= ns.ttl_secs {
                return Err(format!(
                    "Namespace '{}' null_ttl_secs ({}) must be non-zero and shorter than ttl_secs ({})",
                    name, ns.null_ttl_secs, ns.ttl_secs
                ));
            }

            if ns.lock_ttl_secs == 0 {
                return Err(format!("Namespace '{}' lock_ttl_secs cannot be zero", name));
            }

            if ns.strategy == ReadStrategy::LogicalExpire && ns.logical_ttl_secs == 0 {
                return Err(format!(
                    "Namespace '{}' logical_ttl_secs cannot be zero with logical_expire",
                    name
                ));
            }

            if ns.retry.max_attempts == 0 {
                return Err(format!(
                    "Namespace '{}' retry.max_attempts cannot be zero",
                    name
                ));
            }

            if ns.warmup.enabled && ns.warmup.batch_size == 0 {
                return Err(format!(
                    "Namespace '{}' warmup.batch_size cannot be zero",
                    name
                ));
            }

            if ns.retry.backoff == Backoff::Exponential
                && ns.retry.max_delay_ms < ns.retry.base_delay_ms
            {
                return Err(format!(
                    "Namespace '{}' retry.max_delay_ms must be >= retry.base_delay_ms",
                    name
                ));
            }
        }

        Ok(())
    }
}

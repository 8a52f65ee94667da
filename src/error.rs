//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存一致性核心的错误类型和处理机制。

use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 定义了读写路径、锁和后台重建中可能发生的各种错误类型
#[derive(Error, Debug)]
pub enum CacheError {
    /// 记录不存在（包括命中空值缓存的情况）
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 锁竞争，重试次数耗尽
    #[error("Lock contention on '{key}' after {attempts} attempts")]
    LockContention { key: String, attempts: u32 },

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 权威数据源不可用
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// 缓存后端操作失败
    #[error("Backend error: {0}")]
    Backend(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 记录本身不合法（例如缺少id）
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// 重建线程池已满
    #[error("Rebuild pool saturated: {0}")]
    PoolSaturated(String),

    /// 关闭错误
    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    /// 是否属于"记录不存在"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

/// 缓存操作结果类型别名
///
/// 简化错误处理，所有缓存操作都返回此类型
pub type Result<T> = std::result::Result<T, CacheError>;

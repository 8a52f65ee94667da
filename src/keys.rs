//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存键和锁键的命名规则。

use crate::config::NamespaceConfig;

/// 键空间
///
/// 缓存键为 `<key_prefix><id>`，锁键为 `<lock_prefix><id>`，
/// 默认前缀分别是 `cache:<namespace>:` 和 `lock:<namespace>:`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
    key_prefix: String,
    lock_prefix: String,
}

impl KeySpace {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            key_prefix: format!("cache:{}:", namespace),
            lock_prefix: format!("lock:{}:", namespace),
            namespace,
        }
    }

    /// 按键空间配置构建，未配置前缀时使用默认值
    pub fn from_config(namespace: &str, config: &NamespaceConfig) -> Self {
        let mut keys = Self::new(namespace);
        if let Some(prefix) = &config.key_prefix {
            keys.key_prefix = prefix.clone();
        }
        if let Some(prefix) = &config.lock_prefix {
            keys.lock_prefix = prefix.clone();
        }
        keys
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn cache_key(&self, id: i64) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    pub fn lock_key(&self, id: i64) -> String {
        format!("{}{}", self.lock_prefix, id)
    }

    /// 整表列表缓存使用的键
    pub fn list_key(&self) -> String {
        self.key_prefix.trim_end_matches(':').to_string()
    }
}

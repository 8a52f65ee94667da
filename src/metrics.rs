//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存一致性核心的指标收集和监控功能。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集和存储读写路径、锁和后台重建的运行时指标
#[derive(Clone, Debug)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "namespace:layer:op:result"
    pub requests_total: Arc<Mutex<HashMap<String, u64>>>,
    /// 操作耗时（累积时间和计数，用于计算平均值）
    /// key: "namespace:layer:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<Mutex<HashMap<String, (f64, u64)>>>,
    /// 重建线程池排队任务数
    pub rebuild_queue_depth: Arc<Mutex<HashMap<String, usize>>>,
    enabled: Arc<AtomicBool>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            requests_total: Arc::default(),
            operation_duration: Arc::default(),
            rebuild_queue_depth: Arc::default(),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

// 指标不应因某个线程panic而失效
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Metrics {
    /// 开关指标收集，关闭后记录操作直接忽略
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `namespace` - 键空间名称
    /// * `layer` - 层（cache/store/lock/rebuild）
    /// * `op` - 操作类型
    /// * `result` - 操作结果（hit/miss/null/acquired/busy/...）
    pub fn record_request(&self, namespace: &str, layer: &str, op: &str, result: &str) {
        if !self.is_enabled() {
            return;
        }
        let span = span!(Level::TRACE, "cache_request", namespace, layer, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}:{}", namespace, layer, op, result);
        *guard(&self.requests_total).entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, namespace: &str, layer: &str, op: &str, duration_secs: f64) {
        if !self.is_enabled() {
            return;
        }
        let key = format!("{}:{}:{}", namespace, layer, op);
        let mut map = guard(&self.operation_duration);
        let entry = map.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 设置重建队列深度
    pub fn set_rebuild_queue_depth(&self, pool: &str, depth: usize) {
        guard(&self.rebuild_queue_depth).insert(pool.to_string(), depth);
    }

    /// 读取某个计数器的当前值
    pub fn request_count(&self, namespace: &str, layer: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}:{}", namespace, layer, op, result);
        guard(&self.requests_total).get(&key).copied().unwrap_or(0)
    }

    /// 清空所有指标
    pub fn reset(&self) {
        guard(&self.requests_total).clear();
        guard(&self.operation_duration).clear();
        guard(&self.rebuild_queue_depth).clear();
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为字符串返回，用于监控系统采集
///
/// # 返回值
///
/// 返回包含所有指标的字符串
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;
    let reqs = guard(&metrics.requests_total);
    let dur = guard(&metrics.operation_duration);
    let depth = guard(&metrics.rebuild_queue_depth);

    let mut keys: Vec<&String> = reqs.keys().collect();
    keys.sort();

    let mut output = String::new();
    for k in keys {
        let parts: Vec<&str> = k.split(':').collect();
        if parts.len() == 4 {
            output.push_str(&format!(
                "cachewall_requests_total{{namespace=\"{}\", layer=\"{}\", op=\"{}\", result=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], parts[3], reqs[k]
            ));
        } else {
            output.push_str(&format!(
                "cachewall_requests_total{{labels=\"{}\"}} {}\n",
                k, reqs[k]
            ));
        }
    }
    for (k, (total, count)) in dur.iter() {
        let parts: Vec<&str> = k.split(':').collect();
        if parts.len() == 3 {
            output.push_str(&format!(
                "cachewall_operation_duration_seconds_sum{{namespace=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], total
            ));
            output.push_str(&format!(
                "cachewall_operation_duration_seconds_count{{namespace=\"{}\", layer=\"{}\", operation=\"{}\"}} {}\n",
                parts[0], parts[1], parts[2], count
            ));
        }
    }
    for (k, v) in depth.iter() {
        output.push_str(&format!(
            "cachewall_rebuild_queue_depth{{pool=\"{}\"}} {}\n",
            k, v
        ));
    }
    output
}

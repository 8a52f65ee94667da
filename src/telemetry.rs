//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志初始化。

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 初始化全局日志订阅者
///
/// 只生效一次；`RUST_LOG` 存在时优先于 `filter`。日志写到标准错误，
/// 以免和命令行输出混在一起。
///
/// # 参数
///
/// * `filter` - 过滤表达式，例如 "info,cachewall=debug"
pub fn init_logging(filter: &str) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    });
}

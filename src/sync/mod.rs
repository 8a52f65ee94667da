//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后台任务：逻辑过期的异步重建线程池和批量预热。

pub mod rebuild;
pub mod warmup;

pub use self::rebuild::{RebuildJob, RebuildPool, RebuildStats};
pub use self::warmup::{WarmupManager, WarmupResult, WarmupStatus};

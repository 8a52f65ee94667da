//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了对外返回的统一结果结构。

use crate::error::CacheError;
use serde::{Deserialize, Serialize};

/// 统一结果
///
/// 序列化为 `{ "success": .., "errorMsg": .., "data": .. }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    pub success: bool,
    pub error_msg: Option<String>,
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error_msg: None,
            data: Some(data),
        }
    }

    /// 成功但没有数据
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            error_msg: None,
            data: None,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error_msg: Some(msg.into()),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl<T> From<CacheError> for Outcome<T> {
    fn from(e: CacheError) -> Self {
        Outcome::fail(e.to_string())
    }
}

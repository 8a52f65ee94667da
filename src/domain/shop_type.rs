//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了店铺类型记录。

use super::Record;
use serde::{Deserialize, Serialize};

/// 店铺类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    /// 顺序
    pub sort: i32,
}

impl ShopType {
    pub fn new(id: i64, name: impl Into<String>, sort: i32) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            icon: String::new(),
            sort,
        }
    }
}

impl Record for ShopType {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn sort_key(&self) -> i64 {
        i64::from(self.sort)
    }
}

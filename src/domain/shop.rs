//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了店铺记录。

use super::Record;
use serde::{Deserialize, Serialize};

/// 店铺
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub type_id: i64,
    #[serde(default)]
    pub images: String,
    #[serde(default)]
    pub area: Option<String>,
    pub address: String,
    /// 经度
    pub x: f64,
    /// 纬度
    pub y: f64,
    /// 均价，取整
    #[serde(default)]
    pub avg_price: Option<i64>,
    #[serde(default)]
    pub sold: i32,
    #[serde(default)]
    pub comments: i32,
    /// 评分，1~5分，乘10保存
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub open_hours: Option<String>,
}

impl Shop {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            type_id: 1,
            address: String::new(),
            ..Default::default()
        }
    }
}

impl Record for Shop {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

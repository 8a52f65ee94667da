//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了被缓存的权威记录类型。

pub mod shop;
pub mod shop_type;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use self::shop::Shop;
pub use self::shop_type::ShopType;

/// 权威记录特征
///
/// 缓存一致性核心只依赖这组约束，与具体实体无关
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 记录id，尚未持久化的记录可以没有id
    fn id(&self) -> Option<i64>;

    /// 列表缓存中的排序键
    fn sort_key(&self) -> i64 {
        self.id().unwrap_or_default()
    }
}

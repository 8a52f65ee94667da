//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 SeaORM 的关系数据库数据源。
//!
//! 只使用原始 `Statement`，按连接的后端生成占位符（PostgreSQL 为 `$n`，
//! MySQL 和 SQLite 为 `?`）。

use super::{ListSource, RecordStore};
use crate::config::DatabaseConfig;
use crate::domain::{Record, Shop, ShopType};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    QueryResult, Statement, Value,
};
use secrecy::ExposeSecret;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// 可映射到数据表的记录
pub trait SqlRecord: Record {
    /// 表名
    const TABLE: &'static str;

    /// 除 `id` 外的列及其类型，顺序与 `values` 一致
    const COLUMNS: &'static [(&'static str, &'static str)];

    /// 列表查询的排序列
    const SORT_COLUMN: &'static str = "id";

    /// 从查询行构建记录
    fn from_row(row: &QueryResult) -> std::result::Result<Self, DbErr>;

    /// 按 `COLUMNS` 顺序给出列值
    fn values(&self) -> Vec<Value>;
}

impl SqlRecord for Shop {
    const TABLE: &'static str = "tb_shop";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("name", "VARCHAR(128) NOT NULL"),
        ("type_id", "BIGINT NOT NULL"),
        ("images", "VARCHAR(1024) NOT NULL"),
        ("area", "VARCHAR(128)"),
        ("address", "VARCHAR(255) NOT NULL"),
        ("x", "DOUBLE PRECISION NOT NULL"),
        ("y", "DOUBLE PRECISION NOT NULL"),
        ("avg_price", "BIGINT"),
        ("sold", "INTEGER NOT NULL"),
        ("comments", "INTEGER NOT NULL"),
        ("score", "INTEGER NOT NULL"),
        ("open_hours", "VARCHAR(32)"),
    ];

    fn from_row(row: &QueryResult) -> std::result::Result<Self, DbErr> {
        Ok(Shop {
            id: Some(row.try_get("", "id")?),
            name: row.try_get("", "name")?,
            type_id: row.try_get("", "type_id")?,
            images: row.try_get("", "images")?,
            area: row.try_get("", "area")?,
            address: row.try_get("", "address")?,
            x: row.try_get("", "x")?,
            y: row.try_get("", "y")?,
            avg_price: row.try_get("", "avg_price")?,
            sold: row.try_get("", "sold")?,
            comments: row.try_get("", "comments")?,
            score: row.try_get("", "score")?,
            open_hours: row.try_get("", "open_hours")?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.type_id.into(),
            self.images.clone().into(),
            self.area.clone().into(),
            self.address.clone().into(),
            self.x.into(),
            self.y.into(),
            self.avg_price.into(),
            self.sold.into(),
            self.comments.into(),
            self.score.into(),
            self.open_hours.clone().into(),
        ]
    }
}

impl SqlRecord for ShopType {
    const TABLE: &'static str = "tb_shop_type";
    const COLUMNS: &'static [(&'static str, &'static str)] = &[
        ("name", "VARCHAR(32) NOT NULL"),
        ("icon", "VARCHAR(255) NOT NULL"),
        ("sort", "INTEGER NOT NULL"),
    ];
    const SORT_COLUMN: &'static str = "sort";

    fn from_row(row: &QueryResult) -> std::result::Result<Self, DbErr> {
        Ok(ShopType {
            id: Some(row.try_get("", "id")?),
            name: row.try_get("", "name")?,
            icon: row.try_get("", "icon")?,
            sort: row.try_get("", "sort")?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.icon.clone().into(),
            self.sort.into(),
        ]
    }
}

/// 按配置建立数据库连接
#[instrument(skip(config), level = "info")]
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(config.url.expose_secret().to_string());
    opt.max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .map_err(|e| CacheError::StoreUnavailable(format!("Failed to open database: {}", e)))
}

fn unavailable(e: DbErr) -> CacheError {
    CacheError::StoreUnavailable(format!("SQL execution failed: {}", e))
}

/// 关系数据库数据源
pub struct SqlRecordStore<R> {
    connection: Arc<DatabaseConnection>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for SqlRecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: SqlRecord> std::fmt::Debug for SqlRecordStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRecordStore")
            .field("table", &R::TABLE)
            .field("backend", &self.backend())
            .finish()
    }
}

impl<R: SqlRecord> SqlRecordStore<R> {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self {
            connection,
            _record: PhantomData,
        }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.connection.get_database_backend()
    }

    fn placeholder(&self, n: usize) -> String {
        match self.backend() {
            DatabaseBackend::Postgres => format!("${}", n),
            _ => "?".to_string(),
        }
    }

    fn column_list() -> String {
        R::COLUMNS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn statement(&self, sql: String, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.backend(), sql, values)
    }

    /// 建表（已存在时跳过）
    pub async fn ensure_schema(&self) -> Result<()> {
        let id_column = match self.backend() {
            DatabaseBackend::Postgres => "id BIGSERIAL PRIMARY KEY",
            DatabaseBackend::MySql => "id BIGINT PRIMARY KEY AUTO_INCREMENT",
            DatabaseBackend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        };
        let columns = R::COLUMNS
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, {})",
            R::TABLE,
            id_column,
            columns
        );
        self.connection
            .execute(Statement::from_string(self.backend(), sql))
            .await
            .map_err(unavailable)?;
        debug!("Ensured table {}", R::TABLE);
        Ok(())
    }

    /// 插入一条带id的记录
    pub async fn insert(&self, record: &R) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| CacheError::InvalidRecord("record id must be set".to_string()))?;
        let mut values: Vec<Value> = vec![id.into()];
        values.extend(record.values());
        let placeholders = (1..=values.len())
            .map(|n| self.placeholder(n))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} (id, {}) VALUES ({})",
            R::TABLE,
            Self::column_list(),
            placeholders
        );
        self.connection
            .execute(self.statement(sql, values))
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl<R: SqlRecord> RecordStore<R> for SqlRecordStore<R> {
    #[instrument(skip(self), level = "debug", fields(table = R::TABLE))]
    async fn get(&self, id: i64) -> Result<Option<R>> {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = {}",
            Self::column_list(),
            R::TABLE,
            self.placeholder(1)
        );
        let row = self
            .connection
            .query_one(self.statement(sql, vec![id.into()]))
            .await
            .map_err(unavailable)?;
        match row {
            Some(row) => R::from_row(&row).map(Some).map_err(|e| {
                CacheError::StoreUnavailable(format!("Failed to decode {} row: {}", R::TABLE, e))
            }),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, record), level = "debug", fields(table = R::TABLE))]
    async fn update(&self, record: &R) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| CacheError::InvalidRecord("record id must be set".to_string()))?;
        let assignments = R::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = {}", name, self.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values = record.values();
        values.push(id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE id = {}",
            R::TABLE,
            assignments,
            self.placeholder(values.len())
        );
        let result = self
            .connection
            .execute(self.statement(sql, values))
            .await
            .map_err(unavailable)?;
        if result.rows_affected() == 0 {
            return Err(CacheError::NotFound(format!(
                "{} row {} does not exist",
                R::TABLE,
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<R: SqlRecord> ListSource<R> for SqlRecordStore<R> {
    #[instrument(skip(self), level = "debug", fields(table = R::TABLE))]
    async fn list_all(&self) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT id, {} FROM {} ORDER BY {} ASC, id ASC",
            Self::column_list(),
            R::TABLE,
            R::SORT_COLUMN
        );
        let rows = self
            .connection
            .query_all(Statement::from_string(self.backend(), sql))
            .await
            .map_err(unavailable)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(R::from_row(&row).map_err(|e| {
                CacheError::StoreUnavailable(format!("Failed to decode {} row: {}", R::TABLE, e))
            })?);
        }
        Ok(items)
    }
}

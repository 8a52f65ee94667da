//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::domain::{Shop, ShopType};
use crate::manager::CacheManager;
use crate::source::database::{self, SqlRecordStore};
use crate::telemetry::init_logging;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseBackend;
use std::path::PathBuf;
use std::sync::Arc;

mod shop;
mod shop_type;

pub use shop::{ShopArgs, ShopSubcommand};
pub use shop_type::{ShopTypeArgs, ShopTypeSubcommand};

#[derive(Parser, Debug)]
#[command(name = "cachewall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Path to the TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Print the metrics recorded by this command in Prometheus text format"
    )]
    pub show_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "shop", about = "Read, update, warm up or invalidate shops")]
    Shop(ShopArgs),

    #[command(name = "shop-type", about = "Shop type list operations")]
    ShopType(ShopTypeArgs),
}

/// 命令执行上下文
pub(crate) struct AppContext {
    pub manager: CacheManager,
    pub shops: Arc<SqlRecordStore<Shop>>,
    pub shop_types: Arc<SqlRecordStore<ShopType>>,
}

impl AppContext {
    async fn build(config: Config) -> Result<Self> {
        let db_config = config
            .database
            .clone()
            .context("a [database] section is required to reach the record store")?;
        let connection = Arc::new(database::connect(&db_config).await?);
        let shops = Arc::new(SqlRecordStore::<Shop>::new(connection.clone()));
        let shop_types = Arc::new(SqlRecordStore::<ShopType>::new(connection));

        if shops.backend() == DatabaseBackend::Sqlite {
            shops.ensure_schema().await?;
            shop_types.ensure_schema().await?;
        }

        let manager = CacheManager::init(config).await?;
        Ok(Self {
            manager,
            shops,
            shop_types,
        })
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.global.log_filter);

    match &cli.command {
        Commands::Shop(args) => {
            let ctx = AppContext::build(config).await?;
            let result = shop::execute(&ctx, args).await;
            ctx.manager.shutdown().await?;
            result?;
        }
        Commands::ShopType(args) => {
            let ctx = AppContext::build(config).await?;
            let result = shop_type::execute(&ctx, args).await;
            ctx.manager.shutdown().await?;
            result?;
        }
    }

    if cli.show_metrics {
        println!("{}", crate::metrics::get_metrics_string());
    }
    Ok(())
}

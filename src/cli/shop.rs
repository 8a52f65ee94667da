//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了店铺相关命令的实现。

use super::AppContext;
use crate::domain::Shop;
use crate::source::RecordStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct ShopArgs {
    #[command(subcommand)]
    pub command: ShopSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ShopSubcommand {
    #[command(name = "get", about = "Read a shop through the configured strategy")]
    Get {
        #[arg(help = "Shop id")]
        id: i64,
    },

    #[command(name = "update", about = "Update a shop and invalidate its cache entry")]
    Update(UpdateArgs),

    #[command(name = "warmup", about = "Preload shops into the cache")]
    Warmup {
        #[arg(help = "Shop ids; empty means the configured warmup list")]
        ids: Vec<i64>,
    },

    #[command(name = "invalidate", about = "Delete a shop's cache entry")]
    Invalidate {
        #[arg(help = "Shop id")]
        id: i64,
    },
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    #[arg(long, help = "Shop id")]
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub avg_price: Option<i64>,

    #[arg(long)]
    pub open_hours: Option<String>,
}

impl UpdateArgs {
    fn apply(&self, shop: &mut Shop) {
        if let Some(name) = &self.name {
            shop.name = name.clone();
        }
        if let Some(address) = &self.address {
            shop.address = address.clone();
        }
        if let Some(area) = &self.area {
            shop.area = Some(area.clone());
        }
        if let Some(avg_price) = self.avg_price {
            shop.avg_price = Some(avg_price);
        }
        if let Some(open_hours) = &self.open_hours {
            shop.open_hours = Some(open_hours.clone());
        }
    }
}

pub(crate) async fn execute(ctx: &AppContext, args: &ShopArgs) -> Result<()> {
    let repository = ctx.manager.repository::<Shop>("shop", ctx.shops.clone());

    match &args.command {
        ShopSubcommand::Get { id } => {
            let outcome = repository.read_by_id(*id).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ShopSubcommand::Update(update) => {
            let mut shop = ctx
                .shops
                .get(update.id)
                .await?
                .with_context(|| format!("shop {} does not exist", update.id))?;
            update.apply(&mut shop);
            let outcome = repository.update(&shop).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ShopSubcommand::Warmup { ids } if ids.is_empty() => {
            let result = repository.warm_up_configured().await?;
            println!(
                "Warmup finished: loaded={}, failed={}, skipped={}",
                result.loaded, result.failed, result.skipped
            );
        }
        ShopSubcommand::Warmup { ids } => {
            let mut loaded = 0usize;
            for id in ids {
                if repository.warm_up(*id).await? {
                    loaded += 1;
                } else {
                    println!("Shop {} not found, skipped", id);
                }
            }
            println!("Warmed up {}/{} shops", loaded, ids.len());
        }
        ShopSubcommand::Invalidate { id } => {
            let existed = repository.invalidate(*id).await?;
            println!(
                "Cache entry {} {}",
                repository.keys().cache_key(*id),
                if existed { "deleted" } else { "was not cached" }
            );
        }
    }
    Ok(())
}

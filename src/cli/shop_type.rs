//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了店铺类型列表命令的实现。

use super::AppContext;
use crate::domain::ShopType;
use crate::dto::Outcome;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct ShopTypeArgs {
    #[command(subcommand)]
    pub command: ShopTypeSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ShopTypeSubcommand {
    #[command(name = "list", about = "List shop types ordered by sort")]
    List,

    #[command(name = "invalidate", about = "Delete the cached shop type list")]
    Invalidate,
}

pub(crate) async fn execute(ctx: &AppContext, args: &ShopTypeArgs) -> Result<()> {
    let list = ctx
        .manager
        .list_cache::<ShopType>("shop_type", ctx.shop_types.clone());

    match args.command {
        ShopTypeSubcommand::List => {
            let outcome = match list.query_list().await {
                Ok(items) => Outcome::ok(items),
                Err(e) => Outcome::from(e),
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        ShopTypeSubcommand::Invalidate => {
            let existed = list.invalidate().await?;
            println!("Shop type list cache {}", if existed { "deleted" } else { "was not cached" });
        }
    }
    Ok(())
}

//! Read a live DeepBook level-2 book and quote a swap against it.
//!
//! No HTTP server; talks to the configured fullnode directly.
//!
//! Run with:
//! `cargo run --example fetch_orderbook -- [sui_usdc|wal_usdc|deep_usdc] [amount]`

use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use deepbook_swap_backend::config::AppConfig;
use deepbook_swap_backend::deepbook::quote::{min_output, quote};
use deepbook_swap_backend::deepbook::{DeepBookConfig, OrderBookClient, PoolId, SwapSide};
use deepbook_swap_backend::rpc::{LedgerRpc, SuiJsonRpcClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let pool_id = match args.next() {
        Some(raw) => PoolId::parse(&raw).ok_or_else(|| anyhow!("Unknown pool '{}'", raw))?,
        None => config.pool,
    };
    let amount = match args.next() {
        Some(raw) => Decimal::from_str(&raw)?,
        None => Decimal::from(10),
    };

    let pool = DeepBookConfig::for_pool(pool_id);
    let rpc: Arc<dyn LedgerRpc> = Arc::new(SuiJsonRpcClient::new(config.rpc_url.clone(), config.rpc_timeout)?);
    let client = OrderBookClient::new(rpc, pool.clone(), config.orderbook_depth);
    client.set_account(config.orderbook_sender).await;

    println!("Fetching {} from {}", pool_id.display_name(), config.rpc_url);
    let state = client.refresh().await;
    if let Some(reason) = state.degraded_reason() {
        return Err(anyhow!("Order book unavailable: {}", reason));
    }
    let snapshot = client.snapshot().await;

    println!();
    println!("{:>14} {:>16}", format!("price ({})", pool.quote.symbol), format!("qty ({})", pool.base.symbol));
    for level in snapshot.asks.iter().rev() {
        println!("{:>14} {:>16}   ask", level.price, level.quantity);
    }
    println!("{:>14} {:>16}   mid (spread {})", snapshot.mid_price, "", snapshot.spread);
    for level in &snapshot.bids {
        println!("{:>14} {:>16}   bid", level.price, level.quantity);
    }

    for side in [SwapSide::Sell, SwapSide::Buy] {
        let q = quote(side, amount, &snapshot);
        let (spent, received) = match side {
            SwapSide::Sell => (&pool.base.symbol, &pool.quote.symbol),
            SwapSide::Buy => (&pool.quote.symbol, &pool.base.symbol),
        };
        println!();
        println!(
            "{:?} {} {} -> ~{} {} (min {}, impact {} bps, {} levels{})",
            side,
            amount,
            spent,
            q.estimated_output,
            received,
            min_output(q.estimated_output, config.slippage_bps),
            q.price_impact_bps,
            q.levels_consumed,
            if q.fully_fillable { "" } else { ", exceeds visible depth" }
        );
    }

    Ok(())
}

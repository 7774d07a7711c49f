//! DeepBook Swap Backend
//!
//! HTTP API server for wallet-signed swaps against a live DeepBook V3 pool.
//! The order book is read via devInspect on a timer; swaps are built here,
//! signed by the wallet and submitted back through this server.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use deepbook_swap_backend::api::{self, AppState};
use deepbook_swap_backend::blocklist::CoinBlocklist;
use deepbook_swap_backend::config::AppConfig;
use deepbook_swap_backend::deepbook::{
    DeepBookConfig, OrderBookClient, SwapExecutor, SwapTransactionBuilder, SwapValidator,
    TransactionMonitor,
};
use deepbook_swap_backend::rpc::{format_address, LedgerRpc, SuiJsonRpcClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let pool = DeepBookConfig::for_pool(config.pool);
    tracing::info!(
        rpc = %config.rpc_url,
        pool = pool.pool_id.display_name(),
        depth = config.orderbook_depth,
        "Configuration loaded"
    );

    let rpc: Arc<dyn LedgerRpc> = Arc::new(SuiJsonRpcClient::new(config.rpc_url.clone(), config.rpc_timeout)?);

    let orderbook = Arc::new(OrderBookClient::new(
        Arc::clone(&rpc),
        pool.clone(),
        config.orderbook_depth,
    ));
    orderbook.set_account(config.orderbook_sender).await;
    tracing::info!(
        sender = %format_address(&config.orderbook_sender),
        "Fetching initial order book"
    );
    let initial = orderbook.refresh().await;
    match initial.degraded_reason() {
        Some(reason) => tracing::warn!("Starting with a degraded order book: {}", reason),
        None => tracing::info!("Order book {}", initial.label()),
    }
    // Kept alive for the lifetime of the server; dropping it stops polling
    let _polling = orderbook.spawn_polling(config.refresh_interval);

    let executor = Arc::new(SwapExecutor::new(
        Arc::clone(&rpc),
        Arc::clone(&orderbook),
        SwapValidator::new(&pool, config.fee_buffer),
        SwapTransactionBuilder::new(pool, config.slippage_bps),
        TransactionMonitor::new(Arc::clone(&rpc), config.finality_poll),
        config.finality_timeout,
    ));
    let blocklist = Arc::new(CoinBlocklist::new(config.blocklist.clone(), config.rpc_timeout)?);
    let state = AppState::new(executor, blocklist, config.slippage_bps);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    tracing::info!("Starting server on {}", config.bind_addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health                        - Health check");
    tracing::info!("  GET  /api/orderbook                 - Current snapshot and state");
    tracing::info!("  GET  /api/orderbook/depth           - Binance-style depth");
    tracing::info!("  POST /api/orderbook/refresh         - Refresh now");
    tracing::info!("  POST /api/swap/quote                - Quote a swap");
    tracing::info!("  POST /api/swap/build                - Build an unsigned swap");
    tracing::info!("  POST /api/swap/submit               - Submit a signed swap");
    tracing::info!("  GET  /api/session/:address          - In-flight flag and history");
    tracing::info!("  GET  /api/balance/:address          - Pool asset balances");
    tracing::info!("  GET  /api/coins/status              - Coin scam/verified label");
    tracing::info!("  POST /api/coins/blocklist/invalidate - Refetch coin lists");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}

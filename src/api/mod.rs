//! HTTP API for the swap frontend

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

mod balance;
mod coins;
pub mod orderbook;
mod session;
mod swap;

use crate::blocklist::CoinBlocklist;
use crate::deepbook::swap_executor::SwapExecutor;
use crate::deepbook::OrderBookClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<SwapExecutor>,
    pub blocklist: Arc<CoinBlocklist>,
    /// Tolerance used for the min-out shown with quotes
    pub slippage_bps: u32,
}

impl AppState {
    pub fn new(executor: Arc<SwapExecutor>, blocklist: Arc<CoinBlocklist>, slippage_bps: u32) -> Self {
        Self {
            executor,
            blocklist,
            slippage_bps,
        }
    }

    pub fn orderbook(&self) -> &Arc<OrderBookClient> {
        self.executor.orderbook()
    }
}

/// Create the API router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        // Orderbook
        .route("/orderbook", get(orderbook::get_orderbook))
        .route("/orderbook/depth", get(orderbook::get_depth))
        .route("/orderbook/refresh", post(orderbook::refresh))
        // Swap lifecycle
        .route("/swap/quote", post(swap::get_quote))
        .route("/swap/build", post(swap::build_swap))
        .route("/swap/submit", post(swap::submit_swap))
        // Account views
        .route("/session/:address", get(session::get_session))
        .route("/balance/:address", get(balance::get_balance))
        // Coin classification
        .route("/coins/status", get(coins::get_status))
        .route("/coins/blocklist/invalidate", post(coins::invalidate))
        .with_state(state)
}

//! Orderbook API endpoints
//!
//! Serves the latest level-2 snapshot for the configured pool.

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::deepbook::{OrderBookSnapshot, OrderbookState, PriceLevel};
use crate::types::{parse_address, ApiResult};

/// Snapshot plus client state for the UI
#[derive(Debug, Serialize)]
pub struct OrderbookResponse {
    pub pool_id: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    /// idle | fetching | ready | degraded
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub spread_bps: Option<Decimal>,
    pub orderbook: OrderBookSnapshot,
}

/// Binance-style depth (for frontend compatibility)
#[derive(Debug, Serialize)]
pub struct DepthResponse {
    pub symbol: String,
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
    #[serde(rename = "midPrice")]
    pub mid_price: String,
    #[serde(rename = "totalBidDepth")]
    pub total_bid_depth: String,
    #[serde(rename = "totalAskDepth")]
    pub total_ask_depth: String,
    #[serde(rename = "isFallback")]
    pub is_fallback: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Simulation sender for this refresh only
    pub account: Option<String>,
}

/// GET /api/orderbook - Returns the current orderbook snapshot
pub async fn get_orderbook(State(state): State<AppState>) -> Json<OrderbookResponse> {
    let current = state.orderbook().state().await;
    let snapshot = state.orderbook().snapshot().await;
    Json(orderbook_response(&state, &current, &snapshot))
}

/// GET /api/orderbook/depth - Returns Binance-style orderbook depth
pub async fn get_depth(State(state): State<AppState>) -> Json<DepthResponse> {
    let snapshot = state.orderbook().snapshot().await;
    let config = state.orderbook().config();

    let ladder = |levels: &[PriceLevel]| -> Vec<[String; 2]> {
        levels
            .iter()
            .map(|l| [l.price.to_string(), l.quantity.to_string()])
            .collect()
    };
    let total = |levels: &[PriceLevel]| -> Decimal { levels.iter().map(|l| l.quantity).sum() };

    Json(DepthResponse {
        symbol: format!("{}{}", config.base.symbol, config.quote.symbol),
        last_update_id: snapshot.captured_at,
        bids: ladder(&snapshot.bids),
        asks: ladder(&snapshot.asks),
        mid_price: snapshot.mid_price.to_string(),
        total_bid_depth: total(&snapshot.bids).to_string(),
        total_ask_depth: total(&snapshot.asks).to_string(),
        is_fallback: snapshot.is_fallback,
    })
}

/// POST /api/orderbook/refresh - Fetch now instead of waiting for the timer
pub async fn refresh(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<Json<OrderbookResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let current = match request.account.as_deref() {
        Some(account) => state.orderbook().refresh_as(parse_address(account)?).await,
        None => state.orderbook().refresh().await,
    };
    let snapshot = state.orderbook().snapshot().await;
    Ok(Json(orderbook_response(&state, &current, &snapshot)))
}

fn orderbook_response(
    state: &AppState,
    current: &OrderbookState,
    snapshot: &OrderBookSnapshot,
) -> OrderbookResponse {
    let config = state.orderbook().config();
    OrderbookResponse {
        pool_id: config.pool_id.as_str().to_string(),
        base_symbol: config.base.symbol.clone(),
        quote_symbol: config.quote.symbol.clone(),
        state: current.label(),
        degraded_reason: current.degraded_reason().map(str::to_string),
        best_bid: snapshot.best_bid(),
        best_ask: snapshot.best_ask(),
        spread_bps: snapshot.spread_bps(),
        orderbook: snapshot.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_state, level2};
    use crate::rpc::mock::MockLedger;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_idle_serves_fallback() {
        let state = app_state(Arc::new(MockLedger::default()));

        let Json(response) = get_orderbook(State(state)).await;
        assert_eq!(response.state, "idle");
        assert!(response.orderbook.is_fallback);
        assert_eq!(response.base_symbol, "SUI");
    }

    #[tokio::test]
    async fn test_refresh_then_depth() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(level2()));
        let state = app_state(ledger);

        let Json(response) = refresh(State(state.clone()), None).await.unwrap();
        assert_eq!(response.state, "ready");
        assert_eq!(response.best_bid, Some(dec!(0.679)));
        assert_eq!(response.best_ask, Some(dec!(0.681)));

        let Json(depth) = get_depth(State(state)).await;
        assert_eq!(depth.symbol, "SUIUSDC");
        assert_eq!(depth.bids, vec![["0.679".to_string(), "500".to_string()]]);
        assert_eq!(depth.total_ask_depth, "500");
        assert!(!depth.is_fallback);
    }

    #[tokio::test]
    async fn test_refresh_rejects_bad_account() {
        let state = app_state(Arc::new(MockLedger::default()));
        let body = RefreshRequest {
            account: Some("not-an-address".to_string()),
        };
        assert!(refresh(State(state), Some(Json(body))).await.is_err());
    }
}

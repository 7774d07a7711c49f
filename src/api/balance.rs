//! Balance endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::AppState;
use crate::rpc::format_address;
use crate::types::{parse_address, ApiResult};

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub account: String,
    pub pool: String,
    pub base: TokenBalance,
    pub quote: TokenBalance,
}

#[derive(Debug, Serialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub coin_type: String,
    pub amount: Decimal,
}

/// GET /api/balance/:address - Base and quote balances of the pool's assets
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    let account = parse_address(&address)?;
    let balances = state.executor.balances(account).await?;
    let config = state.orderbook().config();

    Ok(Json(BalanceResponse {
        account: format_address(&account),
        pool: config.pool_id.as_str().to_string(),
        base: TokenBalance {
            symbol: config.base.symbol.clone(),
            coin_type: config.base.asset_id.clone(),
            amount: balances.base,
        },
        quote: TokenBalance {
            symbol: config.quote.symbol.clone(),
            coin_type: config.quote.asset_id.clone(),
            amount: balances.quote,
        },
    }))
}

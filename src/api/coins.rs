//! Coin classification endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::blocklist::CoinStatus;
use crate::types::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct CoinStatusQuery {
    pub coin_type: String,
}

#[derive(Debug, Serialize)]
pub struct CoinStatusResponse {
    pub coin_type: String,
    pub status: CoinStatus,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
}

/// GET /api/coins/status?coin_type= - Advisory scam/verified label
pub async fn get_status(
    State(state): State<AppState>,
    Query(query): Query<CoinStatusQuery>,
) -> ApiResult<Json<CoinStatusResponse>> {
    if !query.coin_type.contains("::") {
        return Err(ApiError::BadRequest(format!(
            "Invalid coin type '{}'",
            query.coin_type
        )));
    }
    let status = state.blocklist.status(&query.coin_type).await;
    Ok(Json(CoinStatusResponse {
        coin_type: query.coin_type,
        status,
    }))
}

/// POST /api/coins/blocklist/invalidate - Refetch lists on next lookup
pub async fn invalidate(State(state): State<AppState>) -> Json<InvalidateResponse> {
    state.blocklist.invalidate().await;
    Json(InvalidateResponse { invalidated: true })
}

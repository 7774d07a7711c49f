//! Session endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::AppState;
use crate::deepbook::swap_executor::SwapRecord;
use crate::rpc::format_address;
use crate::types::{parse_address, ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account: String,
    pub created_at: u64,
    pub last_active: u64,
    /// Dropped after this time unless used again
    pub expires_at: u64,
    /// A swap is being built or awaiting finality
    pub submitting: bool,
    pub history: Vec<SwapRecord>,
}

/// GET /api/session/:address - In-flight flag and swap history
pub async fn get_session(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let account = parse_address(&address)?;
    let session = state
        .executor
        .sessions()
        .get(&account)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No session for {}", address)))?;

    Ok(Json(SessionResponse {
        account: format_address(&session.account),
        created_at: session.created_at,
        last_active: session.last_active(),
        expires_at: session.last_active() + state.executor.sessions().idle_ttl().as_millis() as u64,
        submitting: session.is_submitting(),
        history: session.history().await,
    }))
}

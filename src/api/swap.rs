//! Swap endpoints
//!
//! Quote against the cached book, build an unsigned transaction for the
//! wallet, then accept the signed bytes and wait for finality.

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::deepbook::quote::min_output;
use crate::deepbook::{SwapQuote, SwapSide, SwapTransaction, TransactionOutcome};
use crate::rpc::SignedTransaction;
use crate::types::{parse_address, ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub side: SwapSide,
    /// Spent asset in decimal units: USDC for buys, base for sells
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub pool: String,
    pub quote: SwapQuote,
    /// Estimate less slippage tolerance
    pub min_output: Decimal,
    pub slippage_bps: u32,
    /// Quoted against the synthetic book; building is refused
    pub is_fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub account: String,
    pub side: SwapSide,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub swap_id: Uuid,
    pub quote: SwapQuote,
    pub transaction: SwapTransaction,
    /// Base64 BCS `TransactionKind`
    pub tx_kind: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub account: String,
    /// Returned by /swap/build; links the outcome to the prepared swap
    pub swap_id: Option<Uuid>,
    #[serde(flatten)]
    pub signed: SignedTransaction,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_id: Option<Uuid>,
    pub outcome: TransactionOutcome,
}

/// POST /api/swap/quote - Estimate output without touching the chain
pub async fn get_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<QuoteResponse>> {
    if request.amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("amount must be greater than zero".to_string()));
    }

    let (quote, snapshot) = state.executor.quote(request.side, request.amount).await;
    Ok(Json(QuoteResponse {
        pool: snapshot.pool.as_str().to_string(),
        min_output: min_output(quote.estimated_output, state.slippage_bps),
        slippage_bps: state.slippage_bps,
        is_fallback: snapshot.is_fallback,
        quote,
    }))
}

/// POST /api/swap/build - Validate and assemble an unsigned swap
pub async fn build_swap(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> ApiResult<Json<BuildResponse>> {
    let account = parse_address(&request.account)?;
    let prepared = state
        .executor
        .prepare_swap(account, request.side, request.amount)
        .await?;
    let tx_kind = prepared
        .transaction
        .to_bcs_base64()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(BuildResponse {
        swap_id: prepared.swap_id,
        quote: prepared.quote,
        transaction: prepared.transaction,
        tx_kind,
    }))
}

/// POST /api/swap/submit - Execute wallet-signed bytes and report the outcome
pub async fn submit_swap(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let account = parse_address(&request.account)?;
    if request.signed.signatures.is_empty() {
        return Err(ApiError::BadRequest("at least one signature is required".to_string()));
    }

    let outcome = state
        .executor
        .submit_signed_swap(account, request.swap_id, &request.signed)
        .await?;
    Ok(Json(SubmitResponse {
        swap_id: request.swap_id,
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{app_state, level2, ACCOUNT};
    use crate::deepbook::pool::SUI_TYPE;
    use crate::rpc::mock::MockLedger;
    use crate::rpc::ExecutionStatus;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_quote_on_fallback_book() {
        let state = app_state(Arc::new(MockLedger::default()));
        let request = QuoteRequest {
            side: SwapSide::Sell,
            amount: dec!(10),
        };

        let Json(response) = get_quote(State(state), Json(request)).await.unwrap();
        assert!(response.is_fallback);
        assert_eq!(response.pool, "sui_usdc");
        assert!(response.quote.estimated_output > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_quote_rejects_zero_amount() {
        let state = app_state(Arc::new(MockLedger::default()));
        let request = QuoteRequest {
            side: SwapSide::Buy,
            amount: Decimal::ZERO,
        };
        assert!(matches!(
            get_quote(State(state), Json(request)).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_build_refused_without_live_book() {
        let state = app_state(Arc::new(MockLedger::default()));
        let request = BuildRequest {
            account: ACCOUNT.to_string(),
            side: SwapSide::Sell,
            amount: dec!(10),
        };
        assert!(matches!(
            build_swap(State(state), Json(request)).await,
            Err(ApiError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_build_then_submit() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(level2()));
        ledger.push_inspect(Ok(level2()));
        ledger.set_balance(SUI_TYPE, 50_000_000_000);
        ledger.push_status(Ok(Some(ExecutionStatus::Success)));
        let state = app_state(ledger);
        state.orderbook().refresh().await;

        let build = BuildRequest {
            account: ACCOUNT.to_string(),
            side: SwapSide::Sell,
            amount: dec!(10),
        };
        let Json(built) = build_swap(State(state.clone()), Json(build)).await.unwrap();
        assert_eq!(built.quote.estimated_output, dec!(6.79));
        assert!(!built.tx_kind.is_empty());

        let submit = SubmitRequest {
            account: ACCOUNT.to_string(),
            swap_id: Some(built.swap_id),
            signed: SignedTransaction {
                tx_bytes: "AAA=".to_string(),
                signatures: vec!["sig".to_string()],
            },
        };
        let Json(submitted) = submit_swap(State(state), Json(submit)).await.unwrap();
        assert_eq!(submitted.swap_id, Some(built.swap_id));
        assert!(submitted.outcome.is_confirmed());
    }

    #[test]
    fn test_submit_request_shape() {
        let request: SubmitRequest = serde_json::from_value(serde_json::json!({
            "account": "0xb0b",
            "tx_bytes": "AAA=",
            "signatures": ["sig"]
        }))
        .unwrap();
        assert!(request.swap_id.is_none());
        assert_eq!(request.signed.signatures.len(), 1);
    }
}

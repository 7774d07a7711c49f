//! Shared types and error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use move_core_types::account_address::AccountAddress;
use serde::Serialize;

use crate::deepbook::{SwapError, ValidationError};
use crate::rpc::NetworkError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Unprocessable(String),

    /// Upstream node failure; safe to retry
    #[error("Ledger unavailable: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "SWAP_IN_PROGRESS"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "LEDGER_UNAVAILABLE"),
            ApiError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "ORDERBOOK_UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, "{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<NetworkError> for ApiError {
    fn from(err: NetworkError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Unprocessable(err.to_string())
    }
}

impl From<SwapError> for ApiError {
    fn from(err: SwapError) -> Self {
        match err {
            SwapError::SubmissionInProgress => ApiError::Conflict(err.to_string()),
            SwapError::Validation(e) => e.into(),
            SwapError::Network(e) => e.into(),
            SwapError::OrderbookUnavailable(reason) => ApiError::ServiceUnavailable(reason),
            SwapError::Build(reason) => ApiError::Unprocessable(reason),
        }
    }
}

/// Parse a `0x`-prefixed account address from a path or body field.
pub fn parse_address(raw: &str) -> ApiResult<AccountAddress> {
    AccountAddress::from_hex_literal(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid address '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_swap_error_status_mapping() {
        let cases = [
            (SwapError::SubmissionInProgress, StatusCode::CONFLICT),
            (
                SwapError::Validation(ValidationError::NonPositiveAmount),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                SwapError::Network(NetworkError::Timeout),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SwapError::OrderbookUnavailable("fallback".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SwapError::Build("No USDC coins".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_validation_message_carries_thresholds() {
        let err = ApiError::from(ValidationError::BelowMinimumSize {
            required: dec!(10),
            estimated: dec!(9.9),
        });
        let message = err.to_string();
        assert!(message.contains("10"));
        assert!(message.contains("9.9"));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address(" 0x1 ").unwrap(),
            AccountAddress::from_hex_literal("0x1").unwrap()
        );
        assert!(matches!(parse_address("alice"), Err(ApiError::BadRequest(_))));
    }
}

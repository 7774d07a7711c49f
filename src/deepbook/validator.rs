//! Swap intent validation
//!
//! Pure checks run before a swap transaction is built: the pool's minimum
//! order size first, then the account's balance of the spent asset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::orderbook_decoder::OrderBookSnapshot;
use super::pool::{DeepBookConfig, PoolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapSide {
    /// Spend quote, receive base
    Buy,
    /// Spend base, receive quote
    Sell,
}

/// What the user asked for in the panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapIntent {
    pub side: SwapSide,
    /// Quote units for buys, base units for sells
    pub input_amount: Decimal,
    pub pool: PoolId,
    pub estimated_output: Decimal,
}

/// Balances of the pool's two assets, in decimal units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub base: Decimal,
    pub quote: Decimal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("amount {0} is out of range")]
    AmountOutOfRange(Decimal),

    #[error("order size {estimated} is below the pool minimum of {required}")]
    BelowMinimumSize { required: Decimal, estimated: Decimal },

    #[error("insufficient {asset}: need {required}, have {available}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct SwapValidator {
    min_size: Decimal,
    fee_buffer: Decimal,
    base_symbol: String,
    quote_symbol: String,
}

impl SwapValidator {
    pub fn new(config: &DeepBookConfig, fee_buffer: Decimal) -> Self {
        Self {
            min_size: config.min_size_decimal(),
            fee_buffer,
            base_symbol: config.base.symbol.clone(),
            quote_symbol: config.quote.symbol.clone(),
        }
    }

    pub fn with_min_size(mut self, min_size: Decimal) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn validate(
        &self,
        intent: &SwapIntent,
        balances: &AccountBalances,
        snapshot: &OrderBookSnapshot,
    ) -> Result<(), ValidationError> {
        if intent.input_amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }

        let base_quantity = match intent.side {
            SwapSide::Sell => intent.input_amount,
            SwapSide::Buy => match snapshot.best_ask() {
                Some(ask) if !ask.is_zero() => intent
                    .input_amount
                    .checked_div(ask)
                    .ok_or(ValidationError::AmountOutOfRange(intent.input_amount))?,
                _ => Decimal::ZERO,
            },
        };
        if base_quantity < self.min_size {
            return Err(ValidationError::BelowMinimumSize {
                required: self.min_size,
                estimated: base_quantity.round_dp(9),
            });
        }

        let (asset, required, available) = match intent.side {
            SwapSide::Sell => (&self.base_symbol, intent.input_amount, balances.base),
            SwapSide::Buy => (
                &self.quote_symbol,
                intent
                    .input_amount
                    .checked_add(self.fee_buffer)
                    .ok_or(ValidationError::AmountOutOfRange(intent.input_amount))?,
                balances.quote,
            ),
        };
        if available < required {
            return Err(ValidationError::InsufficientBalance {
                asset: asset.clone(),
                required,
                available,
            });
        }

        Ok(())
    }
}

//! Swap quoting against a snapshot
//!
//! Walks the side of the book a swap would consume: asks for buys, bids for
//! sells. The last touched level may be partially filled.

use rust_decimal::Decimal;
use serde::Serialize;

use super::orderbook_decoder::OrderBookSnapshot;
use super::validator::SwapSide;

const BPS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub side: SwapSide,
    pub input_amount: Decimal,
    /// Received asset, decimal units
    pub estimated_output: Decimal,
    /// Quote per base actually paid or received
    pub effective_price: Decimal,
    pub mid_price: Decimal,
    pub price_impact_bps: Decimal,
    pub levels_consumed: usize,
    /// False when visible depth runs out before the input is spent
    pub fully_fillable: bool,
}

pub fn quote(side: SwapSide, input_amount: Decimal, snapshot: &OrderBookSnapshot) -> SwapQuote {
    let levels = match side {
        SwapSide::Buy => &snapshot.asks,
        SwapSide::Sell => &snapshot.bids,
    };

    let mut remaining = input_amount.max(Decimal::ZERO);
    let mut output = Decimal::ZERO;
    let mut levels_consumed = 0;

    for level in levels {
        if remaining.is_zero() {
            break;
        }
        if level.price.is_zero() || level.quantity.is_zero() {
            continue;
        }

        match side {
            SwapSide::Buy => {
                let level_cost = level.price * level.quantity;
                if level_cost <= remaining {
                    output += level.quantity;
                    remaining -= level_cost;
                } else {
                    output += remaining / level.price;
                    remaining = Decimal::ZERO;
                }
            }
            SwapSide::Sell => {
                let take = level.quantity.min(remaining);
                output += take * level.price;
                remaining -= take;
            }
        }
        levels_consumed += 1;
    }

    let spent = input_amount - remaining;
    let effective_price = match side {
        SwapSide::Buy if !output.is_zero() => spent / output,
        SwapSide::Sell if !spent.is_zero() => output / spent,
        _ => Decimal::ZERO,
    };
    let price_impact_bps = if snapshot.mid_price.is_zero() || effective_price.is_zero() {
        Decimal::ZERO
    } else {
        ((effective_price - snapshot.mid_price).abs() / snapshot.mid_price * BPS).round_dp(2)
    };

    SwapQuote {
        side,
        input_amount,
        estimated_output: output.round_dp(9).normalize(),
        effective_price: effective_price.round_dp(9).normalize(),
        mid_price: snapshot.mid_price,
        price_impact_bps,
        levels_consumed,
        fully_fillable: remaining.is_zero(),
    }
}

/// Lowest acceptable output after applying a slippage tolerance.
pub fn min_output(estimated_output: Decimal, slippage_bps: u32) -> Decimal {
    let tolerance = Decimal::from(slippage_bps.min(10_000)) / BPS;
    (estimated_output * (Decimal::ONE - tolerance)).max(Decimal::ZERO)
}

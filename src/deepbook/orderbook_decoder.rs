//! Order book decoding
//!
//! `pool::get_level2_ticks_from_mid` returns four `vector<u64>` values:
//! bid prices, bid quantities, ask prices and ask quantities. The client
//! concatenates their BCS bytes in that order and hands the buffer here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use thiserror::Error;

use super::pool::{DeepBookConfig, PoolId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed order book payload: {0}")]
    MalformedPayload(String),
}

/// One aggregated price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Top-of-book view of one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub pool: PoolId,
    pub bids: Vec<PriceLevel>, // Sorted descending by price
    pub asks: Vec<PriceLevel>, // Sorted ascending by price
    pub spread: Decimal,
    pub mid_price: Decimal,
    /// Unix milliseconds
    pub captured_at: u64,
    /// True when this is the synthetic placeholder, not chain data
    pub is_fallback: bool,
}

impl OrderBookSnapshot {
    /// Build a snapshot and derive spread and mid price from the ladders.
    pub fn from_ladders(
        pool: PoolId,
        bids: Vec<PriceLevel>,
        asks: Vec<PriceLevel>,
        captured_at: u64,
        is_fallback: bool,
    ) -> Self {
        let best_bid = bids.first().map(|l| l.price);
        let best_ask = asks.first().map(|l| l.price);
        let (spread, mid_price) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => ((ask - bid).max(Decimal::ZERO), (ask + bid) / Decimal::TWO),
            (Some(only), None) | (None, Some(only)) => (Decimal::ZERO, only),
            (None, None) => (Decimal::ZERO, Decimal::ZERO),
        };
        Self {
            pool,
            bids,
            asks,
            spread,
            mid_price,
            captured_at,
            is_fallback,
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread_bps(&self) -> Option<Decimal> {
        if self.best_bid().is_none() || self.best_ask().is_none() || self.mid_price.is_zero() {
            return None;
        }
        Some((self.spread / self.mid_price * Decimal::from(10_000)).round_dp(2))
    }
}

/// Decode a concatenated level-2 payload into a snapshot holding at most
/// `depth` levels per side.
pub fn decode(
    payload: &[u8],
    depth: usize,
    config: &DeepBookConfig,
) -> Result<OrderBookSnapshot, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::MalformedPayload("empty payload".to_string()));
    }

    let mut cursor = Cursor::new(payload);
    let bid_prices = read_u64_vector(&mut cursor, "bid prices")?;
    let bid_quantities = read_u64_vector(&mut cursor, "bid quantities")?;
    let ask_prices = read_u64_vector(&mut cursor, "ask prices")?;
    let ask_quantities = read_u64_vector(&mut cursor, "ask quantities")?;

    let consumed = cursor.position() as usize;
    if consumed != payload.len() {
        return Err(DecodeError::MalformedPayload(format!(
            "{} trailing bytes",
            payload.len() - consumed
        )));
    }

    let mut bids = build_ladder(&bid_prices, &bid_quantities, "bid", config)?;
    let mut asks = build_ladder(&ask_prices, &ask_quantities, "ask", config)?;

    bids.sort_by(|a, b| b.price.cmp(&a.price));
    asks.sort_by(|a, b| a.price.cmp(&b.price));
    bids.truncate(depth);
    asks.truncate(depth);

    Ok(OrderBookSnapshot::from_ladders(
        config.pool_id,
        bids,
        asks,
        super::unix_millis(),
        false,
    ))
}

fn build_ladder(
    prices: &[u64],
    quantities: &[u64],
    side: &str,
    config: &DeepBookConfig,
) -> Result<Vec<PriceLevel>, DecodeError> {
    if prices.len() != quantities.len() {
        return Err(DecodeError::MalformedPayload(format!(
            "{} prices ({}) and quantities ({}) differ in length",
            side,
            prices.len(),
            quantities.len()
        )));
    }
    prices
        .iter()
        .zip(quantities)
        .map(|(&price, &quantity)| {
            let price = config.price_to_decimal(price).ok_or_else(|| {
                DecodeError::MalformedPayload(format!("{} price {} is out of range", side, price))
            })?;
            Ok(PriceLevel {
                price,
                quantity: config.base.to_decimal(quantity),
            })
        })
        .collect()
}

fn read_u64_vector(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<Vec<u64>, DecodeError> {
    let len = read_uleb128(cursor, field)?;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if len > remaining / 8 {
        return Err(DecodeError::MalformedPayload(format!(
            "{} declares {} entries but only {} bytes remain",
            field, len, remaining
        )));
    }

    let mut values = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let mut bytes = [0u8; 8];
        cursor
            .read_exact(&mut bytes)
            .map_err(|e| DecodeError::MalformedPayload(format!("{}: {}", field, e)))?;
        values.push(u64::from_le_bytes(bytes));
    }
    Ok(values)
}

fn read_uleb128(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;

    loop {
        let mut byte = [0u8; 1];
        cursor.read_exact(&mut byte).map_err(|_| {
            DecodeError::MalformedPayload(format!("truncated length prefix for {}", field))
        })?;
        let b = byte[0];
        value |= ((b & 0x7f) as u64) << shift;

        if (b & 0x80) == 0 {
            break;
        }

        shift += 7;
        if shift >= 64 {
            return Err(DecodeError::MalformedPayload(format!(
                "length prefix for {} overflows",
                field
            )));
        }
    }

    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// BCS-encode the four ladders the way the Move call returns them.
    pub(crate) fn encode_level2(
        bid_prices: &[u64],
        bid_quantities: &[u64],
        ask_prices: &[u64],
        ask_quantities: &[u64],
    ) -> Vec<Vec<u8>> {
        [bid_prices, bid_quantities, ask_prices, ask_quantities]
            .iter()
            .map(|v| bcs::to_bytes(&v.to_vec()).unwrap())
            .collect()
    }

    fn payload(parts: Vec<Vec<u8>>) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn test_decode_sorts_and_scales() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = payload(encode_level2(
            &[677_000, 679_000, 678_000],
            &[1_000_000_000, 2_000_000_000, 3_000_000_000],
            &[683_000, 681_000],
            &[5_000_000_000, 4_000_000_000],
        ));

        let snapshot = decode(&bytes, 5, &config).unwrap();

        assert_eq!(snapshot.bids.len(), 3);
        assert_eq!(snapshot.asks.len(), 2);
        assert_eq!(snapshot.bids[0], PriceLevel { price: dec!(0.679), quantity: dec!(2) });
        assert_eq!(snapshot.bids[2].price, dec!(0.677));
        assert_eq!(snapshot.asks[0], PriceLevel { price: dec!(0.681), quantity: dec!(4) });
        assert_eq!(snapshot.spread, dec!(0.002));
        assert_eq!(snapshot.mid_price, dec!(0.680));
        assert!(!snapshot.is_fallback);
    }

    #[test]
    fn test_decode_truncates_to_depth() {
        let config = DeepBookConfig::sui_usdc();
        let prices: Vec<u64> = (1..=8).map(|i| 600_000 + i * 1_000).collect();
        let quantities = vec![1_000_000_000; 8];
        let asks: Vec<u64> = prices.iter().map(|p| p + 100_000).collect();
        let bytes = payload(encode_level2(&prices, &quantities, &asks, &quantities));

        let snapshot = decode(&bytes, 3, &config).unwrap();
        assert_eq!(snapshot.bids.len(), 3);
        assert_eq!(snapshot.asks.len(), 3);
        assert_eq!(snapshot.bids[0].price, dec!(0.608));
        assert_eq!(snapshot.asks[0].price, dec!(0.701));
    }

    #[test]
    fn test_decode_empty_ladders() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = payload(encode_level2(&[], &[], &[], &[]));
        let snapshot = decode(&bytes, 5, &config).unwrap();
        assert!(snapshot.bids.is_empty());
        assert_eq!(snapshot.spread, Decimal::ZERO);
        assert_eq!(snapshot.mid_price, Decimal::ZERO);
    }

    #[test]
    fn test_one_sided_book_uses_available_price() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = payload(encode_level2(&[], &[], &[681_000], &[1_000_000_000]));
        let snapshot = decode(&bytes, 5, &config).unwrap();
        assert_eq!(snapshot.spread, Decimal::ZERO);
        assert_eq!(snapshot.mid_price, dec!(0.681));
        assert_eq!(snapshot.spread_bps(), None);
    }

    #[test]
    fn test_rejects_empty_payload() {
        let config = DeepBookConfig::sui_usdc();
        assert!(matches!(
            decode(&[], 5, &config),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = payload(encode_level2(&[679_000, 678_000], &[1], &[], &[]));
        let err = decode(&bytes, 5, &config).unwrap_err();
        assert!(err.to_string().contains("bid prices"));
    }

    #[test]
    fn test_rejects_truncated_and_trailing() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = payload(encode_level2(&[679_000], &[1], &[681_000], &[1]));

        let truncated = &bytes[..bytes.len() - 3];
        assert!(decode(truncated, 5, &config).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(decode(&trailing, 5, &config).is_err());

        // only the first vector present
        assert!(decode(&bytes[..9], 5, &config).is_err());
    }

    #[test]
    fn test_rejects_oversized_length_prefix() {
        let config = DeepBookConfig::sui_usdc();
        let bytes = [0xff, 0xff, 0xff, 0xff, 0x0f, 0, 0, 0];
        assert!(decode(&bytes, 5, &config).is_err());

        let overflow = [0xff; 11];
        assert!(decode(&overflow, 5, &config).is_err());
    }
}

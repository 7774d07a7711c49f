//! Raw on-chain integers <-> human decimals.
//!
//! DeepBook stores prices as `u64` scaled by a global float scalar and the two
//! asset scalars; quantities are plain base units. All conversions go through
//! `u128` quotient/remainder arithmetic so nothing is lost to `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// `raw * base_scalar / quote_scalar / float_scalar` as an exact decimal.
///
/// `None` when the quotient or the denominator needs more than the 96-bit
/// mantissa a `Decimal` carries.
pub fn to_decimal(raw: u64, base_scalar: u64, quote_scalar: u64, float_scalar: u64) -> Option<Decimal> {
    if raw == 0 {
        return Some(Decimal::ZERO);
    }
    let numerator = raw as u128 * base_scalar as u128;
    let denominator = quote_scalar as u128 * float_scalar as u128;
    if denominator == 0 {
        return Some(Decimal::ZERO);
    }

    let whole = u128_to_decimal(numerator / denominator)?;
    let remainder = numerator % denominator;
    if remainder == 0 {
        return Some(whole.normalize());
    }
    let fraction = u128_to_decimal(remainder)?.checked_div(u128_to_decimal(denominator)?)?;
    Some(whole.checked_add(fraction)?.normalize())
}

/// Inverse of [`to_decimal`], rounded to the nearest raw unit.
///
/// Returns `None` for negative values or results that do not fit in a `u64`.
pub fn to_raw(value: Decimal, base_scalar: u64, quote_scalar: u64, float_scalar: u64) -> Option<u64> {
    if value.is_sign_negative() || base_scalar == 0 {
        return None;
    }
    let scaled = value
        .checked_mul(Decimal::from(quote_scalar))?
        .checked_mul(Decimal::from(float_scalar))?
        .checked_div(Decimal::from(base_scalar))?;
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

/// Base units -> decimal units of a single asset.
///
/// Never exceeds `raw`, and any `u64` fits a `Decimal` mantissa.
pub fn quantity_to_decimal(raw: u64, scalar: u64) -> Decimal {
    if scalar == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(raw) / Decimal::from(scalar)).normalize()
}

/// Decimal units -> base units, truncating sub-unit dust.
pub fn quantity_to_raw(amount: Decimal, scalar: u64) -> Option<u64> {
    if amount.is_sign_negative() {
        return None;
    }
    amount.checked_mul(Decimal::from(scalar))?.trunc().to_u64()
}

fn u128_to_decimal(value: u128) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(i128::try_from(value).ok()?, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SUI: u64 = 1_000_000_000;
    const USDC: u64 = 1_000_000;
    const FLOAT: u64 = 1_000_000_000;

    #[test]
    fn test_zero_is_zero() {
        assert_eq!(to_decimal(0, SUI, USDC, FLOAT), Some(Decimal::ZERO));
        assert_eq!(quantity_to_decimal(0, SUI), Decimal::ZERO);
    }

    #[test]
    fn test_sui_usdc_price() {
        assert_eq!(to_decimal(679_000, SUI, USDC, FLOAT), Some(dec!(0.679)));
        assert_eq!(to_decimal(4_250_000, SUI, USDC, FLOAT), Some(dec!(4.25)));
    }

    #[test]
    fn test_large_raw_does_not_overflow() {
        let value = to_decimal(u64::MAX, SUI, USDC, FLOAT).unwrap();
        assert!(value > dec!(18000000000000));
        assert_eq!(quantity_to_decimal(u64::MAX, 1), Decimal::from(u64::MAX));
    }

    #[test]
    fn test_unrepresentable_price_is_none() {
        // ~3.4e38, past the Decimal range
        assert_eq!(to_decimal(u64::MAX, u64::MAX, 1, 1), None);
        // quotient fits but the denominator does not
        assert_eq!(to_decimal(1, 1, u64::MAX, u64::MAX), None);
        assert_eq!(
            to_decimal(u64::MAX, 1, 1, 1),
            Some(Decimal::from(u64::MAX))
        );
    }

    #[test]
    fn test_round_trip_within_one_unit() {
        for raw in [1u64, 7, 679_000, 681_123, 999_999_999, 123_456_789_012] {
            let back = to_raw(to_decimal(raw, SUI, USDC, FLOAT).unwrap(), SUI, USDC, FLOAT).unwrap();
            assert!(back.abs_diff(raw) <= 1, "raw {} came back as {}", raw, back);
        }
        // Awkward scalars force a repeating decimal
        for raw in [1u64, 10, 333_333, 1_000_001] {
            let back = to_raw(to_decimal(raw, 7, 3, 11).unwrap(), 7, 3, 11).unwrap();
            assert!(back.abs_diff(raw) <= 1);
        }
    }

    #[test]
    fn test_to_raw_rejects_negative() {
        assert_eq!(to_raw(dec!(-1), SUI, USDC, FLOAT), None);
        assert_eq!(quantity_to_raw(dec!(-0.5), SUI), None);
    }

    #[test]
    fn test_quantity_helpers() {
        assert_eq!(quantity_to_decimal(1_500_000_000, SUI), dec!(1.5));
        assert_eq!(quantity_to_raw(dec!(1.5), SUI), Some(1_500_000_000));
        // sub-unit dust is dropped
        assert_eq!(quantity_to_raw(dec!(0.0000015), USDC), Some(1));
    }
}

//! Fixed-point quantization: coin granularity and percentage display.
//!
//! All monetary math goes through [`Decimal`], never `f64`. Two granularities
//! exist: coin amounts and prices are held to 8 fractional digits, while USD
//! figures and percentages shown in logs are held to 2.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits of a coin amount (one satoshi for BTC).
pub const COIN_DP: u32 = 8;

/// Fractional digits used for USD values and percentages in reports.
pub const PERC_DP: u32 = 2;

/// Round to coin granularity, half-to-even.
///
/// ```
/// use lpbot::money::round_to_coin;
/// use rust_decimal::Decimal;
///
/// let price: Decimal = "0.000003168".parse().unwrap();
/// assert_eq!(round_to_coin(price), "0.00000317".parse::<Decimal>().unwrap());
/// ```
pub fn round_to_coin(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COIN_DP, RoundingStrategy::MidpointNearestEven)
}

/// Round down to coin granularity.
pub fn floor_to_coin(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COIN_DP, RoundingStrategy::ToNegativeInfinity)
}

/// Round up to coin granularity.
pub fn ceil_to_coin(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COIN_DP, RoundingStrategy::ToPositiveInfinity)
}

/// Round to percentage-display granularity, half-to-even.
pub fn round_to_perc(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PERC_DP, RoundingStrategy::MidpointNearestEven)
}

/// True if `value` carries no digits below coin granularity.
pub fn is_coin_quantized(value: Decimal) -> bool {
    round_to_coin(value) == value
}

/// Express a fractional ratio as a display percentage (`0.0234` → `2.34`).
pub fn as_percent(ratio: Decimal) -> Decimal {
    round_to_perc(ratio * Decimal::ONE_HUNDRED)
}

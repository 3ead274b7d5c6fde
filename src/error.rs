//! Configuration errors raised while resolving market configs.

use rust_decimal::Decimal;

use crate::types::Side;

/// Errors from resolving and validating engine inputs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("market '{0}' is not of the form MARKET_BASE")]
    InvalidMarket(String),

    #[error("{market}: no {side} ladder configured (neither on the market nor on default)")]
    MissingLadder { market: String, side: Side },

    #[error("{market}: {side} tier {slippage} has negative ratio {ratio}")]
    NegativeRatio {
        market: String,
        side: Side,
        slippage: Decimal,
        ratio: Decimal,
    },

    #[error("{market}: {side} tier slippage {slippage} is out of range")]
    SlippageOutOfRange {
        market: String,
        side: Side,
        slippage: Decimal,
    },

    #[error("{market}: {side} tier {slippage} appears more than once")]
    DuplicateTier {
        market: String,
        side: Side,
        slippage: Decimal,
    },

    #[error("{market}: allocation for {currency} is {value}, expected a fraction in [0, 1]")]
    AllocationOutOfRange {
        market: String,
        currency: String,
        value: Decimal,
    },

    #[error("{market}: reserve for {currency} is negative ({value})")]
    NegativeReserve {
        market: String,
        currency: String,
        value: Decimal,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

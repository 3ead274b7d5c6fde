//! Core types: Side, MarketPair, Quote, order tiers and allocation profiles.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::error::Error;

/// Currency code → amount. Always a fresh snapshot, never mutated in place.
pub type Balances = FxHashMap<String, Decimal>;

/// Currency code → minimum amount kept out of allocation.
pub type ReserveConfig = FxHashMap<String, Decimal>;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Exchange order-type name for a resting limit order on this side.
    pub fn limit_order_type(self) -> &'static str {
        match self {
            Side::Buy => "buy_limit",
            Side::Sell => "sell_limit",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.limit_order_type())
    }
}

/// A traded market written `MARKET_BASE`, e.g. `DOGE_BTC`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarketPair {
    /// Currency being bought and sold (`DOGE`).
    pub market: String,
    /// Currency prices are quoted in (`BTC`).
    pub base: String,
}

impl MarketPair {
    pub fn new(market: &str, base: &str) -> Self {
        Self {
            market: market.to_string(),
            base: base.to_string(),
        }
    }
}

impl FromStr for MarketPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('_') {
            Some((market, base))
                if !market.is_empty() && !base.is_empty() && !base.contains('_') =>
            {
                Ok(Self::new(market, base))
            }
            _ => Err(Error::InvalidMarket(s.to_string())),
        }
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.market, self.base)
    }
}

/// Best bid and ask for one market from one data source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }

    /// Unrounded midpoint of bid and ask.
    pub fn midpoint(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// The amounts earmarked for one market this cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation {
    /// Market currency available to the sell ladder.
    pub market_amount: Decimal,
    /// Base currency available to the buy ladder.
    pub base_amount: Decimal,
}

/// Market string → earmarked amounts. Recomputed every cycle.
pub type AllocationResult = BTreeMap<String, Allocation>;

/// One rung of a ladder before pricing.
///
/// `quantity` is a market-currency amount on the sell side and a
/// base-currency value on the buy side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderTier {
    pub slippage: Decimal,
    pub quantity: Decimal,
}

/// A limit order ready for placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricedOrder {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Buy and sell ladders of one market.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ladder<T> {
    pub buy_limit: Vec<T>,
    pub sell_limit: Vec<T>,
}

// Manual impl: an empty ladder needs no `T: Default`.
impl<T> Default for Ladder<T> {
    fn default() -> Self {
        Self {
            buy_limit: Vec::new(),
            sell_limit: Vec::new(),
        }
    }
}

impl<T> Ladder<T> {
    pub fn side(&self, side: Side) -> &[T] {
        match side {
            Side::Buy => &self.buy_limit,
            Side::Sell => &self.sell_limit,
        }
    }

    /// Total rungs across both sides.
    pub fn len(&self) -> usize {
        self.buy_limit.len() + self.sell_limit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unpriced ladders for one market.
pub type TierSet = Ladder<OrderTier>;

/// Priced ladders for one market.
pub type MarketProfile = Ladder<PricedOrder>;

/// Market string → priced ladders. The unit compared cycle-to-cycle and
/// the unit dispatched.
pub type AllocationProfile = BTreeMap<String, MarketProfile>;

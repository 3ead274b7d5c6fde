//! Per-market configuration and the default/override merge.
//!
//! A config file carries a `default` market entry plus one entry per traded
//! market. [`MarketConfig::resolve`] merges the two once, at load time, so the
//! engine only ever sees fully-resolved configs and never falls back at
//! runtime.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::{MarketPair, ReserveConfig, Side};

/// One rung of a configured ladder: how far from the reference price, and
/// what fraction of the earmarked amount it gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    pub slippage: Decimal,
    pub ratio: Decimal,
}

impl Tier {
    pub fn new(slippage: Decimal, ratio: Decimal) -> Self {
        Self { slippage, ratio }
    }
}

/// Partially specified market entry, as written in the config file.
///
/// Maps are merged key by key over the default entry; ladders replace the
/// default ladder wholesale when present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarketOverride {
    /// Currency → fraction of its post-reserve balance given to this market.
    pub allocation: FxHashMap<String, Decimal>,
    /// Currency → reserve, overriding the global reserve for this market.
    pub reserves: ReserveConfig,
    pub buy_limit: Option<Vec<Tier>>,
    pub sell_limit: Option<Vec<Tier>>,
}

/// Fully resolved configuration of one traded market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketConfig {
    pub pair: MarketPair,
    pub allocation: FxHashMap<String, Decimal>,
    pub reserves: ReserveConfig,
    pub buy_limit: Vec<Tier>,
    pub sell_limit: Vec<Tier>,
}

impl MarketConfig {
    /// Merge `entry` over `default` and validate the result.
    pub fn resolve(
        market: &str,
        default: Option<&MarketOverride>,
        entry: &MarketOverride,
    ) -> Result<Self> {
        let pair: MarketPair = market.parse()?;

        let mut allocation = default.map(|d| d.allocation.clone()).unwrap_or_default();
        allocation.extend(entry.allocation.iter().map(|(c, v)| (c.clone(), *v)));

        let mut reserves = default.map(|d| d.reserves.clone()).unwrap_or_default();
        reserves.extend(entry.reserves.iter().map(|(c, v)| (c.clone(), *v)));

        let ladder = |side: Side| -> Result<Vec<Tier>> {
            let pick = |o: &MarketOverride| match side {
                Side::Buy => o.buy_limit.clone(),
                Side::Sell => o.sell_limit.clone(),
            };
            pick(entry)
                .or_else(|| default.and_then(pick))
                .ok_or_else(|| Error::MissingLadder {
                    market: market.to_string(),
                    side,
                })
        };

        let config = Self {
            buy_limit: ladder(Side::Buy)?,
            sell_limit: ladder(Side::Sell)?,
            pair,
            allocation,
            reserves,
        };
        config.validate()?;
        Ok(config)
    }

    /// Market string, e.g. `DOGE_BTC`.
    pub fn market(&self) -> String {
        self.pair.to_string()
    }

    pub fn ladder(&self, side: Side) -> &[Tier] {
        match side {
            Side::Buy => &self.buy_limit,
            Side::Sell => &self.sell_limit,
        }
    }

    /// Fraction of `currency` allocated to this market; zero if unset.
    pub fn allocation_for(&self, currency: &str) -> Decimal {
        self.allocation.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Reserve for `currency`: the market override, else the global value,
    /// else zero.
    pub fn reserve_for(&self, currency: &str, global: &ReserveConfig) -> Decimal {
        self.reserves
            .get(currency)
            .or_else(|| global.get(currency))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn validate(&self) -> Result<()> {
        let market = self.market();

        for (currency, &value) in &self.allocation {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(Error::AllocationOutOfRange {
                    market,
                    currency: currency.clone(),
                    value,
                });
            }
        }

        for (currency, &value) in &self.reserves {
            if value < Decimal::ZERO {
                return Err(Error::NegativeReserve {
                    market,
                    currency: currency.clone(),
                    value,
                });
            }
        }

        for side in [Side::Buy, Side::Sell] {
            let tiers = self.ladder(side);
            for (i, tier) in tiers.iter().enumerate() {
                if tier.ratio < Decimal::ZERO {
                    return Err(Error::NegativeRatio {
                        market,
                        side,
                        slippage: tier.slippage,
                        ratio: tier.ratio,
                    });
                }
                // A buy slippage of 1 or more prices the order at or below zero.
                let too_far = side == Side::Buy && tier.slippage >= Decimal::ONE;
                if tier.slippage < Decimal::ZERO || too_far {
                    return Err(Error::SlippageOutOfRange {
                        market,
                        side,
                        slippage: tier.slippage,
                    });
                }
                if tiers[..i].iter().any(|t| t.slippage == tier.slippage) {
                    return Err(Error::DuplicateTier {
                        market,
                        side,
                        slippage: tier.slippage,
                    });
                }
            }
        }
        Ok(())
    }
}

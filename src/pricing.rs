//! Order pricer: turns tier slippage into absolute limit prices.

use rust_decimal::Decimal;

use crate::money::{ceil_to_coin, floor_to_coin, round_to_coin};
use crate::types::{MarketProfile, OrderTier, PricedOrder, Quote, Side, TierSet};

/// Which reference price a ladder is priced from.
///
/// One policy applies to every rung of every ladder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PricingPolicy {
    /// Buys reference the bid, sells reference the ask.
    #[default]
    Touch,
    /// Both sides reference the bid/ask midpoint.
    Midpoint,
}

impl PricingPolicy {
    pub fn reference(self, quote: &Quote, side: Side) -> Decimal {
        match (self, side) {
            (PricingPolicy::Touch, Side::Buy) => quote.bid,
            (PricingPolicy::Touch, Side::Sell) => quote.ask,
            (PricingPolicy::Midpoint, _) => quote.midpoint(),
        }
    }
}

/// Limit price of a buy tier: below the reference by `slippage`.
///
/// Never above the reference, even when the reference itself carries
/// digits below coin granularity (a midpoint, say).
pub fn buy_price(reference: Decimal, slippage: Decimal) -> Decimal {
    round_to_coin(reference - reference * slippage).min(floor_to_coin(reference))
}

/// Limit price of a sell tier: above the reference by `slippage`.
///
/// Never below the reference.
pub fn sell_price(reference: Decimal, slippage: Decimal) -> Decimal {
    round_to_coin(reference + reference * slippage).max(ceil_to_coin(reference))
}

/// Price both ladders of one market. Quantities pass through unchanged.
pub fn price_orders(tiers: &TierSet, quote: &Quote, policy: PricingPolicy) -> MarketProfile {
    let price_side = |side: Side, price: fn(Decimal, Decimal) -> Decimal| -> Vec<PricedOrder> {
        let reference = policy.reference(quote, side);
        tiers
            .side(side)
            .iter()
            .map(|&OrderTier { slippage, quantity }| PricedOrder {
                price: price(reference, slippage),
                quantity,
            })
            .collect()
    };

    MarketProfile {
        buy_limit: price_side(Side::Buy, buy_price),
        sell_limit: price_side(Side::Sell, sell_price),
    }
}

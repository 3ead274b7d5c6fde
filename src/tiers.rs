//! Order tier allocator: splits an earmarked amount across a ladder.

use rust_decimal::Decimal;

use crate::market::{MarketConfig, Tier};
use crate::money::round_to_coin;
use crate::types::{OrderTier, TierSet};

/// Split `market_amount` over the sell ladder and `base_amount` over the buy
/// ladder.
///
/// Ratios are applied independently and need not sum to one. Zero-sized
/// tiers stay in the output so ladders keep their configured shape; they
/// are dropped at placement time.
pub fn allocate_orders(
    market_amount: Decimal,
    base_amount: Decimal,
    config: &MarketConfig,
) -> TierSet {
    TierSet {
        buy_limit: split(base_amount, &config.buy_limit),
        sell_limit: split(market_amount, &config.sell_limit),
    }
}

fn split(amount: Decimal, ladder: &[Tier]) -> Vec<OrderTier> {
    ladder
        .iter()
        .map(|tier| OrderTier {
            slippage: tier.slippage,
            quantity: round_to_coin(amount * tier.ratio),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketOverride;
    use rust_decimal_macros::dec;

    fn config() -> MarketConfig {
        let entry = MarketOverride {
            buy_limit: Some(vec![
                Tier::new(dec!(0.01), dec!(0.2)),
                Tier::new(dec!(0.03), dec!(0.3)),
                Tier::new(dec!(0.05), dec!(0.5)),
            ]),
            sell_limit: Some(vec![
                Tier::new(dec!(0.02), dec!(0.6)),
                Tier::new(dec!(0.04), dec!(0.6)),
            ]),
            ..Default::default()
        };
        MarketConfig::resolve("DOGE_BTC", None, &entry).unwrap()
    }

    #[test]
    fn sides_use_their_own_amount() {
        let tiers = allocate_orders(dec!(1000), dec!(0.1), &config());

        let buys: Vec<_> = tiers.buy_limit.iter().map(|t| t.quantity).collect();
        assert_eq!(buys, vec![dec!(0.02), dec!(0.03), dec!(0.05)]);

        // ratios over-subscribe on purpose: 0.6 + 0.6
        let sells: Vec<_> = tiers.sell_limit.iter().map(|t| t.quantity).collect();
        assert_eq!(sells, vec![dec!(600), dec!(600)]);
        assert_eq!(tiers.sell_limit[1].slippage, dec!(0.04));
    }

    #[test]
    fn quantities_are_coin_quantized() {
        let tiers = allocate_orders(dec!(1), dec!(0.123456789), &config());
        assert_eq!(tiers.buy_limit[0].quantity, dec!(0.02469136));
    }

    #[test]
    fn zero_amounts_keep_ladder_shape() {
        let tiers = allocate_orders(Decimal::ZERO, Decimal::ZERO, &config());
        assert_eq!(tiers.buy_limit.len(), 3);
        assert_eq!(tiers.sell_limit.len(), 2);
        assert!(tiers.sell_limit.iter().all(|t| t.quantity.is_zero()));
    }
}

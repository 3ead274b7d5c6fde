//! Allocation calculator: how much of each currency goes to each market.

use rust_decimal::Decimal;

use crate::market::MarketConfig;
use crate::types::{Allocation, AllocationResult, Balances, ReserveConfig};

/// Share of a balance available to one market: the surplus above reserve,
/// scaled by the market's allocation fraction. Never negative.
pub fn allocate_coin(balance: Decimal, reserve: Decimal, allocation_pct: Decimal) -> Decimal {
    ((balance - reserve) * allocation_pct).max(Decimal::ZERO)
}

/// Compute the market- and base-currency amounts earmarked for every
/// configured market.
///
/// Currencies absent from `balances` count as a zero balance, so allocation
/// works before the account has ever held a reserve currency.
pub fn compute_allocations(
    balances: &Balances,
    reserves: &ReserveConfig,
    markets: &[MarketConfig],
) -> AllocationResult {
    markets
        .iter()
        .map(|config| {
            let coin = |currency: &str| {
                allocate_coin(
                    balances.get(currency).copied().unwrap_or(Decimal::ZERO),
                    config.reserve_for(currency, reserves),
                    config.allocation_for(currency),
                )
            };
            let allocation = Allocation {
                market_amount: coin(&config.pair.market),
                base_amount: coin(&config.pair.base),
            };
            (config.market(), allocation)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketOverride, Tier};
    use rust_decimal_macros::dec;

    fn market(name: &str, market_pct: Decimal, base_pct: Decimal) -> MarketConfig {
        let pair: crate::types::MarketPair = name.parse().unwrap();
        let entry = MarketOverride {
            allocation: [(pair.market.clone(), market_pct), (pair.base.clone(), base_pct)]
                .into_iter()
                .collect(),
            buy_limit: Some(vec![Tier::new(dec!(0.01), dec!(1))]),
            sell_limit: Some(vec![Tier::new(dec!(0.01), dec!(1))]),
            ..Default::default()
        };
        MarketConfig::resolve(name, None, &entry).unwrap()
    }

    fn balances(items: &[(&str, Decimal)]) -> Balances {
        items.iter().map(|(c, v)| (c.to_string(), *v)).collect()
    }

    #[test]
    fn surplus_above_reserve_is_scaled() {
        assert_eq!(allocate_coin(dec!(1.0), dec!(0.5), dec!(0.5)), dec!(0.25));
    }

    #[test]
    fn below_reserve_floors_at_zero() {
        assert_eq!(allocate_coin(dec!(0.2), dec!(0.5), dec!(0.5)), Decimal::ZERO);
    }

    #[test]
    fn allocates_both_currencies() {
        let bals = balances(&[("BTC", dec!(1.0)), ("DOGE", dec!(10000))]);
        let reserves = balances(&[("BTC", dec!(0.5)), ("DOGE", dec!(2000))]);
        let markets = [market("DOGE_BTC", dec!(0.5), dec!(0.5))];
        let allocs = compute_allocations(&bals, &reserves, &markets);

        let a = allocs["DOGE_BTC"];
        assert_eq!(a.base_amount, dec!(0.25));
        assert_eq!(a.market_amount, dec!(4000));
    }

    #[test]
    fn missing_balance_is_zero() {
        let bals = balances(&[("BTC", dec!(1.0))]);
        let reserves = balances(&[("BTC", dec!(0.5)), ("LTC", dec!(3))]);
        let markets = [market("LTC_BTC", dec!(0.5), dec!(0.2))];
        let allocs = compute_allocations(&bals, &reserves, &markets);

        assert_eq!(allocs["LTC_BTC"].market_amount, Decimal::ZERO);
        assert_eq!(allocs["LTC_BTC"].base_amount, dec!(0.1));
    }

    #[test]
    fn markets_share_base_currency_independently() {
        let bals = balances(&[("BTC", dec!(2.0)), ("DOGE", dec!(100)), ("LTC", dec!(10))]);
        let reserves = Balances::default();
        let allocs = compute_allocations(
            &bals,
            &reserves,
            &[
                market("DOGE_BTC", dec!(1), dec!(0.25)),
                market("LTC_BTC", dec!(1), dec!(0.5)),
            ],
        );

        assert_eq!(allocs.len(), 2);
        assert_eq!(allocs["DOGE_BTC"].base_amount, dec!(0.5));
        assert_eq!(allocs["LTC_BTC"].base_amount, dec!(1.0));
    }
}

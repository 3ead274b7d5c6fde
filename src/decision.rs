//! Rebalance decision engine.
//!
//! Compares a freshly computed [`AllocationProfile`] against the profile that
//! was last dispatched, and the account's reserve balances against their
//! targets, to decide whether the resting orders need replacing.
//!
//! Tiers are paired by position: rung *i* of the new ladder is compared with
//! rung *i* of the baseline ladder. Comparisons are only meaningful while the
//! ladder configuration stays the same shape, so a ladder whose length
//! changed is itself reported as a reason to rebalance.

use std::fmt;

use rust_decimal::Decimal;

use crate::money::as_percent;
use crate::types::{AllocationProfile, Balances, ReserveConfig, Side};
use crate::valuation::Valuation;

/// Relative drift thresholds, as fractions (`0.02` = 2%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tolerances {
    pub price: Decimal,
    pub amount: Decimal,
}

/// Why a rebalance was called for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebalanceReason {
    /// Nothing has been dispatched yet.
    NoBaseline,
    /// The market was not part of the last dispatched profile.
    NewMarket { market: String },
    /// A ladder has a different number of rungs than its baseline.
    LadderReshaped {
        market: String,
        side: Side,
        baseline: usize,
        current: usize,
    },
    PriceDrift {
        market: String,
        side: Side,
        tier: usize,
        old: Decimal,
        new: Decimal,
        change: Decimal,
    },
    AmountDrift {
        market: String,
        side: Side,
        tier: usize,
        old: Decimal,
        new: Decimal,
        change: Decimal,
    },
    /// A reserve currency's balance moved too far from its target, in USD.
    ReserveDrift {
        currency: String,
        balance_usd: Decimal,
        reserve_usd: Decimal,
        threshold_usd: Decimal,
    },
}

fn direction(old: Decimal, new: Decimal) -> &'static str {
    if new > old { "higher" } else { "lower" }
}

impl fmt::Display for RebalanceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebalanceReason::NoBaseline => write!(f, "no previous rebalance data"),
            RebalanceReason::NewMarket { market } => {
                write!(f, "{market} has no previously placed orders")
            }
            RebalanceReason::LadderReshaped {
                market,
                side,
                baseline,
                current,
            } => write!(
                f,
                "{market} {side} ladder changed from {baseline} to {current} tiers"
            ),
            RebalanceReason::PriceDrift {
                market,
                side,
                tier,
                old,
                new,
                change,
            } => write!(
                f,
                "{market} {side} tier {tier} price is {}% {} than allotted ({old} -> {new})",
                as_percent(*change),
                direction(*old, *new),
            ),
            RebalanceReason::AmountDrift {
                market,
                side,
                tier,
                old,
                new,
                change,
            } => write!(
                f,
                "{market} {side} tier {tier} amount is {}% {} than allotted ({old} -> {new})",
                as_percent(*change),
                direction(*old, *new),
            ),
            RebalanceReason::ReserveDrift {
                currency,
                balance_usd,
                reserve_usd,
                threshold_usd,
            } => {
                let cmp = if balance_usd > reserve_usd { ">" } else { "<" };
                write!(
                    f,
                    "{currency} balance ${balance_usd} {cmp} reserve ${reserve_usd} \
                     by more than ${threshold_usd}"
                )
            }
        }
    }
}

/// Outcome of one evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decision {
    /// First tripped condition, if any.
    pub reason: Option<RebalanceReason>,
    /// Reserve currencies skipped because no price was available.
    pub unpriced: Vec<String>,
}

impl Decision {
    pub fn should_rebalance(&self) -> bool {
        self.reason.is_some()
    }
}

/// `|new - old| / |new|`; `None` when `new` is zero.
pub fn relative_change(new: Decimal, old: Decimal) -> Option<Decimal> {
    (new - old).abs().checked_div(new.abs())
}

/// Compare `current` against `baseline` tier by tier.
///
/// Price drift is checked on every rung. Amount drift is skipped for rungs
/// whose new amount is zero. A zero new price against a non-zero old one
/// counts as a 100% change.
pub fn compare_profiles(
    current: &AllocationProfile,
    baseline: &AllocationProfile,
    tolerances: &Tolerances,
) -> Option<RebalanceReason> {
    for (market, profile) in current {
        let Some(prev) = baseline.get(market) else {
            return Some(RebalanceReason::NewMarket {
                market: market.clone(),
            });
        };

        for side in [Side::Buy, Side::Sell] {
            let (new_ladder, old_ladder) = (profile.side(side), prev.side(side));
            if new_ladder.len() != old_ladder.len() {
                return Some(RebalanceReason::LadderReshaped {
                    market: market.clone(),
                    side,
                    baseline: old_ladder.len(),
                    current: new_ladder.len(),
                });
            }

            for (tier, (n, o)) in new_ladder.iter().zip(old_ladder).enumerate() {
                let price_change = relative_change(n.price, o.price).unwrap_or(
                    if n.price == o.price { Decimal::ZERO } else { Decimal::ONE },
                );
                if price_change > tolerances.price {
                    return Some(RebalanceReason::PriceDrift {
                        market: market.clone(),
                        side,
                        tier,
                        old: o.price,
                        new: n.price,
                        change: price_change,
                    });
                }

                if let Some(amount_change) = relative_change(n.quantity, o.quantity) {
                    if amount_change > tolerances.amount {
                        return Some(RebalanceReason::AmountDrift {
                            market: market.clone(),
                            side,
                            tier,
                            old: o.quantity,
                            new: n.quantity,
                            change: amount_change,
                        });
                    }
                }
            }
        }
    }
    None
}

/// Reserve policy and tolerances that decide when to replace orders.
#[derive(Clone, Debug, Default)]
pub struct RebalancePolicy {
    pub tolerances: Tolerances,
    pub reserves: ReserveConfig,
    /// Allowed USD distance between a reserve currency's balance and its
    /// reserve target.
    pub reserve_thresh_usd: Decimal,
}

impl RebalancePolicy {
    /// Check every reserve currency's USD balance against its USD reserve.
    ///
    /// Currencies without a price are collected in the second element and
    /// skipped; they never fail the check. Without a BTC/USD rate that is
    /// every reserve currency.
    pub fn reserve_drift(
        &self,
        balances: &Balances,
        valuation: &Valuation<'_>,
    ) -> (Option<RebalanceReason>, Vec<String>) {
        let mut currencies: Vec<(&String, &Decimal)> = self.reserves.iter().collect();
        currencies.sort();

        let mut unpriced = Vec::new();
        for (currency, &reserve) in currencies {
            let balance = balances.get(currency).copied().unwrap_or(Decimal::ZERO);
            let (Some(balance_usd), Some(reserve_usd)) = (
                valuation.coin_to_usd(currency, balance),
                valuation.coin_to_usd(currency, reserve),
            ) else {
                unpriced.push(currency.clone());
                continue;
            };

            let threshold_usd = self.reserve_thresh_usd;
            if balance_usd > reserve_usd + threshold_usd
                || balance_usd < reserve_usd - threshold_usd
            {
                let reason = RebalanceReason::ReserveDrift {
                    currency: currency.clone(),
                    balance_usd,
                    reserve_usd,
                    threshold_usd,
                };
                return (Some(reason), unpriced);
            }
        }
        (None, unpriced)
    }

    /// Decide whether `current` should replace the resting orders.
    ///
    /// Conditions are checked cheapest first and the first one that trips
    /// ends the evaluation: missing baseline, profile drift, reserve drift.
    pub fn should_rebalance(
        &self,
        current: &AllocationProfile,
        baseline: Option<&AllocationProfile>,
        balances: &Balances,
        valuation: &Valuation<'_>,
    ) -> Decision {
        let Some(baseline) = baseline else {
            return Decision {
                reason: Some(RebalanceReason::NoBaseline),
                unpriced: Vec::new(),
            };
        };

        if let Some(reason) = compare_profiles(current, baseline, &self.tolerances) {
            return Decision {
                reason: Some(reason),
                unpriced: Vec::new(),
            };
        }

        let (reason, unpriced) = self.reserve_drift(balances, valuation);
        Decision { reason, unpriced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::TickerSnapshot;
    use crate::types::{MarketProfile, PricedOrder, Quote};
    use rust_decimal_macros::dec;
    use rustc_hash::FxHashMap;

    fn order(price: Decimal, quantity: Decimal) -> PricedOrder {
        PricedOrder { price, quantity }
    }

    fn profile(buys: Vec<PricedOrder>, sells: Vec<PricedOrder>) -> AllocationProfile {
        [(
            "DOGE_BTC".to_string(),
            MarketProfile {
                buy_limit: buys,
                sell_limit: sells,
            },
        )]
        .into_iter()
        .collect()
    }

    fn base() -> AllocationProfile {
        profile(
            vec![order(dec!(100), dec!(0.25))],
            vec![order(dec!(110), dec!(1000))],
        )
    }

    fn tolerances() -> Tolerances {
        Tolerances {
            price: dec!(0.01),
            amount: dec!(0.05),
        }
    }

    fn tickers() -> TickerSnapshot {
        let quotes: FxHashMap<String, Quote> =
            [("DOGE_BTC".to_string(), Quote::new(dec!(0.000001), dec!(0.0000011)))]
                .into_iter()
                .collect();
        TickerSnapshot::new().with_source("qtrade", quotes)
    }

    fn policy(reserves: &[(&str, Decimal)], thresh: Decimal) -> RebalancePolicy {
        RebalancePolicy {
            tolerances: tolerances(),
            reserves: reserves.iter().map(|(c, v)| (c.to_string(), *v)).collect(),
            reserve_thresh_usd: thresh,
        }
    }

    #[test]
    fn relative_change_by_magnitude() {
        assert_eq!(relative_change(dec!(100), dec!(99)), Some(dec!(0.01)));
        assert_eq!(relative_change(dec!(100), dec!(101)), Some(dec!(0.01)));
        assert_eq!(relative_change(Decimal::ZERO, dec!(1)), None);
    }

    #[test]
    fn identical_profiles_hold() {
        assert_eq!(compare_profiles(&base(), &base(), &tolerances()), None);
    }

    #[test]
    fn price_at_tolerance_holds_above_trips() {
        // (100 - 99) / 100 = 0.01 exactly
        let at = profile(vec![order(dec!(100), dec!(0.25))], vec![order(dec!(110), dec!(1000))]);
        let old_at = profile(vec![order(dec!(99), dec!(0.25))], vec![order(dec!(110), dec!(1000))]);
        assert_eq!(compare_profiles(&at, &old_at, &tolerances()), None);

        let old_above = profile(
            vec![order(dec!(98.99999999), dec!(0.25))],
            vec![order(dec!(110), dec!(1000))],
        );
        let reason = compare_profiles(&at, &old_above, &tolerances()).unwrap();
        assert!(matches!(
            reason,
            RebalanceReason::PriceDrift { side: Side::Buy, tier: 0, .. }
        ));
    }

    #[test]
    fn price_drop_also_trips() {
        let current = profile(
            vec![order(dec!(100), dec!(0.25))],
            vec![order(dec!(105), dec!(1000))],
        );
        let reason = compare_profiles(&current, &base(), &tolerances()).unwrap();
        match reason {
            RebalanceReason::PriceDrift { side, old, new, .. } => {
                assert_eq!(side, Side::Sell);
                assert_eq!((old, new), (dec!(110), dec!(105)));
            }
            other => panic!("unexpected reason {other:?}"),
        }
    }

    #[test]
    fn amount_drift_trips() {
        let current = profile(
            vec![order(dec!(100), dec!(0.3))],
            vec![order(dec!(110), dec!(1000))],
        );
        let reason = compare_profiles(&current, &base(), &tolerances()).unwrap();
        assert!(matches!(reason, RebalanceReason::AmountDrift { side: Side::Buy, .. }));
        assert!(reason.to_string().contains("higher"));
    }

    #[test]
    fn zero_new_amount_is_not_compared() {
        let current = profile(vec![order(dec!(100), dec!(0))], vec![order(dec!(110), dec!(1000))]);
        assert_eq!(compare_profiles(&current, &base(), &tolerances()), None);
    }

    #[test]
    fn zero_new_price_trips() {
        let current = profile(
            vec![order(dec!(0), dec!(0.25))],
            vec![order(dec!(110), dec!(1000))],
        );
        let reason = compare_profiles(&current, &base(), &tolerances()).unwrap();
        assert!(matches!(
            reason,
            RebalanceReason::PriceDrift { change, .. } if change == Decimal::ONE
        ));
    }

    #[test]
    fn reshaped_ladder_trips() {
        let current = profile(
            vec![order(dec!(100), dec!(0.25)), order(dec!(95), dec!(0.1))],
            vec![order(dec!(110), dec!(1000))],
        );
        assert_eq!(
            compare_profiles(&current, &base(), &tolerances()),
            Some(RebalanceReason::LadderReshaped {
                market: "DOGE_BTC".into(),
                side: Side::Buy,
                baseline: 1,
                current: 2,
            })
        );
    }

    #[test]
    fn new_market_trips() {
        let mut current = base();
        current.insert("LTC_BTC".into(), MarketProfile::default());
        assert_eq!(
            compare_profiles(&current, &base(), &tolerances()),
            Some(RebalanceReason::NewMarket { market: "LTC_BTC".into() })
        );
    }

    #[test]
    fn no_baseline_always_rebalances() {
        let tickers = tickers();
        let valuation = Valuation::new(&tickers, dec!(10000));
        let decision = policy(&[], dec!(10)).should_rebalance(
            &AllocationProfile::new(),
            None,
            &Balances::default(),
            &valuation,
        );
        assert_eq!(decision.reason, Some(RebalanceReason::NoBaseline));
        assert!(decision.should_rebalance());
    }

    #[test]
    fn reserve_drift_beyond_threshold() {
        let tickers = tickers();
        let valuation = Valuation::new(&tickers, dec!(10000));
        let balances: Balances = [("BTC".to_string(), dec!(0.6))].into_iter().collect();

        // 0.6 BTC = $6000 vs reserve 0.5 BTC = $5000, threshold $500
        let decision = policy(&[("BTC", dec!(0.5))], dec!(500)).should_rebalance(
            &base(),
            Some(&base()),
            &balances,
            &valuation,
        );
        assert!(matches!(
            decision.reason,
            Some(RebalanceReason::ReserveDrift { ref currency, .. }) if currency == "BTC"
        ));

        // same drift inside a $2000 threshold
        let decision = policy(&[("BTC", dec!(0.5))], dec!(2000)).should_rebalance(
            &base(),
            Some(&base()),
            &balances,
            &valuation,
        );
        assert!(!decision.should_rebalance());
    }

    #[test]
    fn reserve_below_target_trips() {
        let tickers = tickers();
        let valuation = Valuation::new(&tickers, dec!(10000));
        let decision = policy(&[("DOGE", dec!(1000000))], dec!(1)).should_rebalance(
            &base(),
            Some(&base()),
            &Balances::default(),
            &valuation,
        );
        assert!(decision.reason.unwrap().to_string().contains("<"));
    }

    #[test]
    fn unpriced_reserve_is_skipped() {
        let tickers = tickers();
        let valuation = Valuation::new(&tickers, dec!(10000));
        let decision = policy(&[("NANO", dec!(100))], dec!(1)).should_rebalance(
            &base(),
            Some(&base()),
            &Balances::default(),
            &valuation,
        );
        assert!(!decision.should_rebalance());
        assert_eq!(decision.unpriced, vec!["NANO".to_string()]);
    }

    #[test]
    fn missing_usd_rate_skips_every_reserve() {
        let tickers = tickers();
        let valuation = Valuation::btc_only(&tickers);
        let balances: Balances = [("BTC".to_string(), dec!(5))].into_iter().collect();
        let policy = policy(&[("BTC", dec!(0.5)), ("DOGE", dec!(10))], dec!(1));
        let decision = policy.should_rebalance(&base(), Some(&base()), &balances, &valuation);
        assert!(!decision.should_rebalance());
        assert_eq!(decision.unpriced, vec!["BTC".to_string(), "DOGE".to_string()]);
    }
}

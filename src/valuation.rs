//! Currency conversion: coin → BTC via ticker bids, BTC → USD via a spot price.
//!
//! The BTC/USD rate is optional. Without it every USD figure is `None` and
//! values are reported in BTC only.

use std::fmt;

use rust_decimal::Decimal;

use crate::money::{round_to_coin, round_to_perc};
use crate::ticker::TickerSnapshot;
use crate::types::Balances;

/// Currency every other coin is valued through.
pub const BTC: &str = "BTC";

/// A value in BTC and, when a rate is known, USD.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountValue {
    pub btc: Decimal,
    pub usd: Option<Decimal>,
    /// Currencies with a balance but no BTC price; counted as zero.
    pub unpriced: Vec<String>,
}

impl fmt::Display for AccountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.usd {
            Some(usd) => write!(f, "{} BTC (${usd})", self.btc),
            None => write!(f, "{} BTC", self.btc),
        }
    }
}

/// Prices coins against one ticker snapshot and an optional BTC/USD rate.
#[derive(Clone, Copy, Debug)]
pub struct Valuation<'a> {
    tickers: &'a TickerSnapshot,
    btc_usd: Option<Decimal>,
}

impl<'a> Valuation<'a> {
    pub fn new(tickers: &'a TickerSnapshot, btc_usd: Decimal) -> Self {
        Self {
            tickers,
            btc_usd: Some(btc_usd),
        }
    }

    /// A valuation with no USD rate: BTC figures only.
    pub fn btc_only(tickers: &'a TickerSnapshot) -> Self {
        Self {
            tickers,
            btc_usd: None,
        }
    }

    pub fn tickers(&self) -> &'a TickerSnapshot {
        self.tickers
    }

    pub fn btc_usd(&self) -> Option<Decimal> {
        self.btc_usd
    }

    /// Value `amount` of `coin` in BTC using the `COIN_BTC` bid of the
    /// highest-priority source that quotes it. `None` if no source does.
    pub fn coin_to_btc(&self, coin: &str, amount: Decimal) -> Option<Decimal> {
        if coin == BTC {
            return Some(amount);
        }
        let bid = self.tickers.bid(&format!("{coin}_{BTC}"))?;
        Some(round_to_coin(amount * bid))
    }

    /// Unrounded USD value of a BTC amount. `None` without a rate.
    pub fn btc_to_usd(&self, amount: Decimal) -> Option<Decimal> {
        self.btc_usd.map(|rate| amount * rate)
    }

    /// USD value of `amount` of `coin`, at display precision.
    pub fn coin_to_usd(&self, coin: &str, amount: Decimal) -> Option<Decimal> {
        let btc = self.coin_to_btc(coin, amount)?;
        self.btc_to_usd(btc).map(round_to_perc)
    }

    /// Sum every balance in BTC, then convert to USD.
    pub fn account_value(&self, balances: &Balances) -> AccountValue {
        let mut btc = Decimal::ZERO;
        let mut unpriced = Vec::new();
        for (coin, &amount) in balances {
            match self.coin_to_btc(coin, amount) {
                Some(v) => btc += v,
                None => unpriced.push(coin.clone()),
            }
        }
        unpriced.sort();
        AccountValue {
            btc,
            usd: self.btc_to_usd(btc).map(round_to_perc),
            unpriced,
        }
    }

    /// Gain of a BTC-denominated account value over its cost basis.
    pub fn account_gain(&self, value_btc: Decimal, cost_basis_btc: Decimal) -> AccountValue {
        let gain = round_to_coin(value_btc - cost_basis_btc);
        AccountValue {
            btc: gain,
            usd: self.btc_to_usd(gain).map(round_to_perc),
            unpriced: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quote;
    use rust_decimal_macros::dec;
    use rustc_hash::FxHashMap;

    fn snapshot() -> TickerSnapshot {
        let qtrade: FxHashMap<String, Quote> = [
            ("DOGE_BTC".to_string(), Quote::new(dec!(0.0000032), dec!(0.0000033))),
            ("LTC_BTC".to_string(), Quote::new(dec!(0.009), dec!(0.0091))),
        ]
        .into_iter()
        .collect();
        TickerSnapshot::new().with_source("qtrade", qtrade)
    }

    #[test]
    fn btc_is_identity() {
        let tickers = snapshot();
        let v = Valuation::new(&tickers, dec!(10000));
        assert_eq!(v.coin_to_btc("BTC", dec!(0.5)), Some(dec!(0.5)));
        assert_eq!(v.coin_to_usd("BTC", dec!(0.5)), Some(dec!(5000)));
    }

    #[test]
    fn coin_valued_at_bid() {
        let tickers = snapshot();
        let v = Valuation::new(&tickers, dec!(10000));
        assert_eq!(v.coin_to_btc("DOGE", dec!(100000)), Some(dec!(0.32)));
        assert_eq!(v.coin_to_usd("DOGE", dec!(100000)), Some(dec!(3200)));
    }

    #[test]
    fn unpriced_coin_is_none() {
        let tickers = snapshot();
        let v = Valuation::new(&tickers, dec!(10000));
        assert_eq!(v.coin_to_btc("NANO", dec!(5)), None);
        assert_eq!(v.coin_to_usd("NANO", dec!(5)), None);
    }

    #[test]
    fn account_value_skips_unpriced() {
        let tickers = snapshot();
        let v = Valuation::new(&tickers, dec!(10000));
        let balances: Balances = [
            ("BTC".to_string(), dec!(1)),
            ("LTC".to_string(), dec!(10)),
            ("NANO".to_string(), dec!(50)),
        ]
        .into_iter()
        .collect();

        let value = v.account_value(&balances);
        assert_eq!(value.btc, dec!(1.09));
        assert_eq!(value.usd, Some(dec!(10900)));
        assert_eq!(value.unpriced, vec!["NANO".to_string()]);
    }

    #[test]
    fn gain_against_cost_basis() {
        let tickers = snapshot();
        let v = Valuation::new(&tickers, dec!(10000));
        let gain = v.account_gain(dec!(1.09), dec!(1.1));
        assert_eq!(gain.btc, dec!(-0.01));
        assert_eq!(gain.usd, Some(dec!(-100)));
        assert_eq!(gain.to_string(), "-0.01 BTC ($-100)");
    }

    #[test]
    fn without_rate_values_in_btc_only() {
        let tickers = snapshot();
        let v = Valuation::btc_only(&tickers);
        assert_eq!(v.coin_to_btc("DOGE", dec!(100000)), Some(dec!(0.32)));
        assert_eq!(v.coin_to_usd("DOGE", dec!(100000)), None);

        let balances: Balances = [("BTC".to_string(), dec!(1))].into_iter().collect();
        let value = v.account_value(&balances);
        assert_eq!(value.btc, dec!(1));
        assert_eq!(value.usd, None);
        assert_eq!(value.to_string(), "1 BTC");
        assert_eq!(v.account_gain(dec!(1), dec!(0.5)).usd, None);
    }
}

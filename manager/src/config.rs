//! TOML configuration loading and validation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lpbot_exchange::qtrade::client::DEFAULT_ENDPOINT;
use lpbot::{
    MarketConfig, MarketOverride, PricingPolicy, RebalancePolicy, ReserveConfig, Tier, Tolerances,
};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Name of the market entry every other market inherits from.
pub const DEFAULT_MARKET: &str = "default";

/// Ticker sources this build knows how to construct.
pub const KNOWN_SOURCES: &[&str] = &["qtrade"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    pub orderbook_manager: ManagerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_keyfile")]
    pub keyfile: PathBuf,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            keyfile: default_keyfile(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_keyfile() -> PathBuf {
    PathBuf::from("lpbot_hmac.txt")
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    /// Ticker sources, highest priority first.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["qtrade".into()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Seconds between ticks.
    #[serde(default = "default_monitor_period")]
    pub monitor_period: u64,
    /// Seconds to wait before the first tick.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,
    #[serde(default)]
    pub dry_run_mode: bool,
    pub price_tolerance: Decimal,
    pub amount_tolerance: Decimal,
    pub reserve_thresh_usd: Decimal,
    #[serde(default)]
    pub cost_basis_btc: Decimal,
    #[serde(default)]
    pub pricing: PricingPolicy,
    #[serde(default)]
    pub currency_reserves: FxHashMap<String, Decimal>,
    pub markets: BTreeMap<String, MarketEntry>,
}

fn default_monitor_period() -> u64 {
    60
}
fn default_startup_delay() -> u64 {
    2
}

/// One `[orderbook_manager.markets.X]` table.
///
/// Allocation fractions are written as bare currency keys next to
/// `intervals` and `currency_reserves`:
///
/// ```toml
/// [orderbook_manager.markets.DOGE_BTC]
/// BTC = 0.5
/// DOGE = 0.5
///
/// [orderbook_manager.markets.DOGE_BTC.intervals.buy_limit]
/// "0.01" = 0.5
/// "0.03" = 0.5
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketEntry {
    #[serde(default)]
    pub intervals: Intervals,
    #[serde(default)]
    pub currency_reserves: FxHashMap<String, Decimal>,
    #[serde(flatten)]
    pub allocation: FxHashMap<String, Decimal>,
}

/// Tier ladders keyed by slippage, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Intervals {
    #[serde(default, deserialize_with = "ordered_tiers")]
    pub buy_limit: Option<Vec<Tier>>,
    #[serde(default, deserialize_with = "ordered_tiers")]
    pub sell_limit: Option<Vec<Tier>>,
}

impl From<&MarketEntry> for MarketOverride {
    fn from(entry: &MarketEntry) -> Self {
        MarketOverride {
            allocation: entry.allocation.clone(),
            reserves: entry.currency_reserves.clone(),
            buy_limit: entry.intervals.buy_limit.clone(),
            sell_limit: entry.intervals.sell_limit.clone(),
        }
    }
}

/// Read a `{ "slippage" = ratio, ... }` table into tiers, keeping key order.
fn ordered_tiers<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<Vec<Tier>>, D::Error> {
    struct TierTable;

    impl<'de> Visitor<'de> for TierTable {
        type Value = Vec<Tier>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of slippage = ratio entries")
        }

        fn visit_map<A: MapAccess<'de>>(
            self,
            mut map: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut tiers = Vec::new();
            while let Some((slippage, ratio)) = map.next_entry::<String, Decimal>()? {
                let slippage = Decimal::from_str(slippage.trim()).map_err(|e| {
                    de::Error::custom(format!("tier key '{slippage}' is not a decimal: {e}"))
                })?;
                tiers.push(Tier::new(slippage, ratio));
            }
            Ok(tiers)
        }
    }

    d.deserialize_map(TierTable).map(Some)
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        let om = &self.orderbook_manager;
        if om.monitor_period == 0 {
            return Err(Error::Config("monitor_period must be > 0".into()));
        }
        if om.price_tolerance < Decimal::ZERO {
            return Err(Error::Config("price_tolerance must be >= 0".into()));
        }
        if om.amount_tolerance < Decimal::ZERO {
            return Err(Error::Config("amount_tolerance must be >= 0".into()));
        }
        if om.reserve_thresh_usd < Decimal::ZERO {
            return Err(Error::Config("reserve_thresh_usd must be >= 0".into()));
        }
        if let Some((currency, value)) = om
            .currency_reserves
            .iter()
            .find(|(_, v)| **v < Decimal::ZERO)
        {
            return Err(Error::Config(format!(
                "currency_reserves.{currency} must be >= 0, got {value}"
            )));
        }
        if self.market_data.sources.is_empty() {
            return Err(Error::Config("market_data.sources must not be empty".into()));
        }
        if let Some(unknown) = self
            .market_data
            .sources
            .iter()
            .find(|s| !KNOWN_SOURCES.contains(&s.as_str()))
        {
            return Err(Error::Config(format!(
                "unknown market data source '{unknown}' (known: {})",
                KNOWN_SOURCES.join(", ")
            )));
        }
        // Every market must resolve, and there must be at least one.
        self.resolve_markets()?;
        Ok(())
    }

    /// Merge every market entry over `default` into a fully resolved config.
    pub fn resolve_markets(&self) -> Result<Vec<MarketConfig>> {
        let markets = &self.orderbook_manager.markets;
        let default = markets.get(DEFAULT_MARKET).map(MarketOverride::from);

        let resolved = markets
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_MARKET)
            .map(|(name, entry)| MarketConfig::resolve(name, default.as_ref(), &entry.into()))
            .collect::<lpbot::error::Result<Vec<_>>>()?;

        if resolved.is_empty() {
            return Err(Error::Config(
                "no markets configured besides 'default'".into(),
            ));
        }
        Ok(resolved)
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            price: self.orderbook_manager.price_tolerance,
            amount: self.orderbook_manager.amount_tolerance,
        }
    }

    pub fn reserves(&self) -> ReserveConfig {
        self.orderbook_manager.currency_reserves.clone()
    }

    pub fn rebalance_policy(&self) -> RebalancePolicy {
        RebalancePolicy {
            tolerances: self.tolerances(),
            reserves: self.reserves(),
            reserve_thresh_usd: self.orderbook_manager.reserve_thresh_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn example_toml() -> &'static str {
        r#"
[exchange]
endpoint = "https://api.qtrade.io"
keyfile = "lpbot_hmac.txt"

[market_data]
sources = ["qtrade"]

[orderbook_manager]
monitor_period = 30
dry_run_mode = true
price_tolerance = 0.02
amount_tolerance = 0.05
reserve_thresh_usd = 50
cost_basis_btc = "1.5"
pricing = "midpoint"

[orderbook_manager.currency_reserves]
BTC = 0.5
DOGE = 2000

[orderbook_manager.markets.default]
BTC = 0.5
DOGE = 0.5

[orderbook_manager.markets.default.intervals.buy_limit]
"0.05" = 0.3
"0.01" = 0.2
"0.03" = 0.5

[orderbook_manager.markets.default.intervals.sell_limit]
"0.01" = 1.0

[orderbook_manager.markets.DOGE_BTC]
BTC = 0.25

[orderbook_manager.markets.LTC_BTC]
LTC = 1

[orderbook_manager.markets.LTC_BTC.currency_reserves]
BTC = 0.1

[orderbook_manager.markets.LTC_BTC.intervals.sell_limit]
"0.02" = 0.5
"0.04" = 0.5
"#
    }

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn parse_example_config() {
        let config = parse(example_toml());
        let om = &config.orderbook_manager;
        assert_eq!(om.monitor_period, 30);
        assert_eq!(om.startup_delay_secs, 2);
        assert!(om.dry_run_mode);
        assert_eq!(om.price_tolerance, dec!(0.02));
        assert_eq!(om.cost_basis_btc, dec!(1.5));
        assert_eq!(om.pricing, PricingPolicy::Midpoint);
        assert_eq!(om.currency_reserves["DOGE"], dec!(2000));
        assert_eq!(om.markets.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_for_optional_sections() {
        let toml = r#"
[orderbook_manager]
price_tolerance = 0.02
amount_tolerance = 0.02
reserve_thresh_usd = 10

[orderbook_manager.markets.DOGE_BTC]
BTC = 0.5
[orderbook_manager.markets.DOGE_BTC.intervals.buy_limit]
"0.01" = 1
[orderbook_manager.markets.DOGE_BTC.intervals.sell_limit]
"0.01" = 1
"#;
        let config = parse(toml);
        assert_eq!(config.exchange.endpoint, "https://api.qtrade.io");
        assert_eq!(config.market_data.sources, vec!["qtrade".to_string()]);
        assert_eq!(config.orderbook_manager.monitor_period, 60);
        assert!(!config.orderbook_manager.dry_run_mode);
        assert_eq!(config.orderbook_manager.pricing, PricingPolicy::Touch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tiers_keep_document_order() {
        let config = parse(example_toml());
        let default = &config.orderbook_manager.markets[DEFAULT_MARKET];
        let slips: Vec<_> = default
            .intervals
            .buy_limit
            .as_ref()
            .unwrap()
            .iter()
            .map(|t| t.slippage)
            .collect();
        assert_eq!(slips, vec![dec!(0.05), dec!(0.01), dec!(0.03)]);
    }

    #[test]
    fn markets_inherit_from_default() {
        let markets = parse(example_toml()).resolve_markets().unwrap();
        assert_eq!(markets.len(), 2);

        let doge = markets.iter().find(|m| m.market() == "DOGE_BTC").unwrap();
        assert_eq!(doge.allocation_for("BTC"), dec!(0.25));
        assert_eq!(doge.allocation_for("DOGE"), dec!(0.5));
        assert_eq!(doge.buy_limit.len(), 3);

        let ltc = markets.iter().find(|m| m.market() == "LTC_BTC").unwrap();
        assert_eq!(ltc.allocation_for("LTC"), dec!(1));
        assert_eq!(ltc.sell_limit.len(), 2);
        assert_eq!(ltc.buy_limit.len(), 3);
        assert_eq!(ltc.reserve_for("BTC", &parse(example_toml()).reserves()), dec!(0.1));
    }

    #[test]
    fn validate_catches_zero_period() {
        let mut config = parse(example_toml());
        config.orderbook_manager.monitor_period = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_catches_negative_tolerance() {
        let mut config = parse(example_toml());
        config.orderbook_manager.amount_tolerance = dec!(-0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_unknown_source() {
        let mut config = parse(example_toml());
        config.market_data.sources = vec!["bittrex".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bittrex"));
    }

    #[test]
    fn validate_requires_a_market() {
        let mut config = parse(example_toml());
        config.orderbook_manager.markets.retain(|name, _| name == DEFAULT_MARKET);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn bad_market_string_is_engine_error() {
        let toml = example_toml().replace("markets.LTC_BTC", "markets.LTCBTC");
        let err = parse(&toml).validate().unwrap_err();
        assert!(matches!(err, Error::Engine(lpbot::Error::InvalidMarket(_))));
    }

    #[test]
    fn bad_tier_key_fails_to_parse() {
        let toml = example_toml().replace("\"0.02\" = 0.5", "\"two\" = 0.5");
        assert!(toml::from_str::<Config>(&toml).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, example_toml()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rebalance_policy().reserve_thresh_usd, dec!(50));
        assert_eq!(config.tolerances().amount, dec!(0.05));
    }

    #[test]
    fn shipped_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
        let config = Config::load(&path).unwrap();
        assert!(config.orderbook_manager.dry_run_mode);
        assert_eq!(config.resolve_markets().unwrap().len(), 2);
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}

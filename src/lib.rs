//! # lpbot
//!
//! The allocation and rebalancing engine of a tiered market-making bot.
//!
//! Given account balances, a reserve policy and per-market allocation
//! targets, the engine computes a ladder of priced limit orders for every
//! traded market and decides whether the orders currently resting on the
//! exchange have drifted far enough from that target to be replaced.
//!
//! Everything here is pure: no I/O, no clocks, no logging. The exchange
//! client lives in `lpbot-exchange` and the control loop in `lpbot-manager`.
//!
//! ## Pipeline
//!
//! ```text
//! balances ──► compute_allocations ──► allocate_orders ──► price_orders ──► should_rebalance
//!               (reserve, pct)          (tier ratios)       (bid/ask)        (tolerances)
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use lpbot::{
//!     allocate_orders, compute_allocations, price_orders, Balances, MarketConfig,
//!     MarketOverride, PricingPolicy, Quote, ReserveConfig, Tier,
//! };
//! use rust_decimal::Decimal;
//!
//! let d = |s: &str| s.parse::<Decimal>().unwrap();
//!
//! let entry = MarketOverride {
//!     allocation: [("BTC".to_string(), d("0.5")), ("DOGE".to_string(), d("0.5"))]
//!         .into_iter()
//!         .collect(),
//!     buy_limit: Some(vec![Tier::new(d("0.01"), d("1.0"))]),
//!     sell_limit: Some(vec![Tier::new(d("0.01"), d("1.0"))]),
//!     ..Default::default()
//! };
//! let market = MarketConfig::resolve("DOGE_BTC", None, &entry).unwrap();
//!
//! let balances: Balances = [("BTC".to_string(), d("1.0"))].into_iter().collect();
//! let reserves: ReserveConfig = [("BTC".to_string(), d("0.5"))].into_iter().collect();
//!
//! let allocs = compute_allocations(&balances, &reserves, std::slice::from_ref(&market));
//! let alloc = allocs["DOGE_BTC"];
//! assert_eq!(alloc.base_amount, d("0.25"));
//!
//! let tiers = allocate_orders(alloc.market_amount, alloc.base_amount, &market);
//! let quote = Quote::new(d("0.0000032"), d("0.0000033"));
//! let profile = price_orders(&tiers, &quote, PricingPolicy::Touch);
//!
//! assert_eq!(profile.buy_limit[0].price, d("0.00000317"));
//! assert_eq!(profile.buy_limit[0].quantity, d("0.25"));
//! assert!(profile.sell_limit[0].quantity.is_zero());
//! ```
//!
//! ## Decimal Representation
//!
//! Amounts and prices are [`rust_decimal::Decimal`]. Coin amounts and prices
//! are quantized to 8 fractional digits ([`money::round_to_coin`]); USD
//! figures and percentages in reports to 2 ([`money::round_to_perc`]).

pub mod allocation;
pub mod decision;
pub mod error;
pub mod market;
pub mod money;
pub mod pricing;
pub mod ticker;
pub mod tiers;
pub mod trades;
pub mod types;
pub mod valuation;

pub use allocation::{allocate_coin, compute_allocations};
pub use decision::{Decision, RebalancePolicy, RebalanceReason, Tolerances, compare_profiles};
pub use error::Error;
pub use market::{MarketConfig, MarketOverride, Tier};
pub use money::{COIN_DP, PERC_DP, round_to_coin, round_to_perc};
pub use pricing::{PricingPolicy, price_orders};
pub use ticker::TickerSnapshot;
pub use tiers::allocate_orders;
pub use trades::TradeWatermark;
pub use types::{
    Allocation, AllocationProfile, AllocationResult, Balances, Ladder, MarketPair, MarketProfile,
    OrderTier, PricedOrder, Quote, ReserveConfig, Side, TierSet,
};
pub use valuation::{AccountValue, BTC, Valuation};

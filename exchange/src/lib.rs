//! Exchange and market-data traits for lpbot.
//!
//! Provides the `Exchange` trait the orderbook manager trades through and
//! the `TickerFeed` trait it reads prices from. Implementations:
//!
//! - **qTrade** (feature `qtrade`): qTrade REST API, blocking
//! - **Mock** ([`mock`]): in-memory exchange and feed for tests

pub mod collector;
pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "qtrade")]
pub mod qtrade;

pub use collector::MarketDataCollector;
pub use error::ExchangeError;
pub use types::*;

use lpbot::{Balances, Quote};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

/// An authenticated exchange account: balances, resting orders, trades.
pub trait Exchange {
    /// Establish the session and load market metadata.
    fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Available balances, excluding amounts held by open orders.
    fn balances(&self) -> Result<Balances, ExchangeError>;

    /// Available balances plus amounts held by open orders.
    fn balances_merged(&self) -> Result<Balances, ExchangeError>;

    /// Every order currently resting on the book.
    fn open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError>;

    /// Metadata for a market string such as `DOGE_BTC`.
    fn market(&self, market: &str) -> Result<MarketInfo, ExchangeError>;

    /// Spot USD price of a currency.
    fn currency_price(&self, code: &str) -> Result<Decimal, ExchangeError>;

    /// Place a limit order. A validation rejection comes back as
    /// `ExchangeError::Api { code: 400, .. }`.
    fn place_order(&self, order: &NewOrder) -> Result<OrderId, ExchangeError>;

    /// Cancel every open order on the account.
    fn cancel_all_orders(&self) -> Result<(), ExchangeError>;

    /// Trades with an id greater than `newer_than`; all trades if `None`.
    fn trades(&self, newer_than: Option<u64>) -> Result<Vec<TradeRecord>, ExchangeError>;
}

/// A source of best bid/ask quotes, keyed by market string.
pub trait TickerFeed {
    /// Source name used in logs and snapshot lookups.
    fn name(&self) -> &str;

    /// Fetch the current quotes for every market this source covers.
    fn fetch(&self) -> Result<FxHashMap<String, Quote>, ExchangeError>;
}

impl<T: TickerFeed + ?Sized> TickerFeed for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self) -> Result<FxHashMap<String, Quote>, ExchangeError> {
        (**self).fetch()
    }
}

//! Mock exchange and ticker feed for testing.
//!
//! Use these in integration tests to drive the orderbook manager without
//! network calls. Every call is recorded, and any operation can be made to
//! fail on demand.
//!
//! ```ignore
//! use lpbot_exchange::mock::{MockExchange, Operation};
//!
//! let exchange = MockExchange::builder()
//!     .with_balance("BTC", dec!(1.0))
//!     .with_market(36, "DOGE_BTC")
//!     .with_btc_price(dec!(10000))
//!     .fail_on(Operation::Balances)
//!     .build();
//! ```

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lpbot::{Balances, MarketPair, Quote, Side};
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ExchangeError;
use crate::types::*;
use crate::{Exchange, TickerFeed};

/// Exchange operations, for recording calls and injecting failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Balances,
    BalancesMerged,
    OpenOrders,
    Market,
    CurrencyPrice,
    PlaceOrder,
    CancelAll,
    Trades,
}

/// Builder for `MockExchange`.
pub struct MockExchangeBuilder {
    balances: Balances,
    holds: Balances,
    markets: Vec<MarketInfo>,
    prices: FxHashMap<String, Decimal>,
    open_orders: Vec<OpenOrder>,
    trades: Vec<TradeRecord>,
    failing: FxHashSet<Operation>,
    failing_once: FxHashSet<Operation>,
    rejections: FxHashMap<String, u16>,
}

impl MockExchangeBuilder {
    /// Available balance, not held by any order.
    pub fn with_balance(mut self, currency: &str, amount: Decimal) -> Self {
        self.balances.insert(currency.to_string(), amount);
        self
    }

    /// Amount held by open orders; only visible through `balances_merged`.
    pub fn with_hold(mut self, currency: &str, amount: Decimal) -> Self {
        self.holds.insert(currency.to_string(), amount);
        self
    }

    /// Register a market. Panics on a malformed market string.
    pub fn with_market(mut self, id: u64, market: &str) -> Self {
        let pair: MarketPair = market.parse().expect("mock market must be MARKET_BASE");
        self.markets.push(MarketInfo::new(id, pair));
        self
    }

    pub fn with_price(mut self, currency: &str, usd: Decimal) -> Self {
        self.prices.insert(currency.to_string(), usd);
        self
    }

    pub fn with_btc_price(self, usd: Decimal) -> Self {
        self.with_price("BTC", usd)
    }

    pub fn with_open_order(mut self, order: OpenOrder) -> Self {
        self.open_orders.push(order);
        self
    }

    pub fn with_trade(mut self, trade: TradeRecord) -> Self {
        self.trades.push(trade);
        self
    }

    /// Make `op` fail with a connection error until cleared.
    pub fn fail_on(mut self, op: Operation) -> Self {
        self.failing.insert(op);
        self
    }

    /// Make only the next call of `op` fail with a connection error.
    pub fn fail_once(mut self, op: Operation) -> Self {
        self.failing_once.insert(op);
        self
    }

    /// Reject every order on `market` with the given API status code.
    pub fn reject_market(mut self, market: &str, code: u16) -> Self {
        self.rejections.insert(market.to_string(), code);
        self
    }

    pub fn build(self) -> MockExchange {
        MockExchange {
            connected: false,
            balances: Mutex::new(self.balances),
            holds: self.holds,
            markets: self.markets,
            prices: self.prices,
            open_orders: Mutex::new(self.open_orders),
            trades: Mutex::new(self.trades),
            failing: Mutex::new(self.failing),
            failing_once: Mutex::new(self.failing_once),
            rejections: self.rejections,
            calls: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            next_order_id: Mutex::new(1),
        }
    }
}

/// A mock exchange that records calls and returns configurable responses.
pub struct MockExchange {
    connected: bool,
    balances: Mutex<Balances>,
    holds: Balances,
    markets: Vec<MarketInfo>,
    prices: FxHashMap<String, Decimal>,
    open_orders: Mutex<Vec<OpenOrder>>,
    trades: Mutex<Vec<TradeRecord>>,
    failing: Mutex<FxHashSet<Operation>>,
    failing_once: Mutex<FxHashSet<Operation>>,
    rejections: FxHashMap<String, u16>,
    calls: Mutex<Vec<Operation>>,
    placed: Mutex<Vec<NewOrder>>,
    next_order_id: Mutex<u64>,
}

impl MockExchange {
    pub fn builder() -> MockExchangeBuilder {
        MockExchangeBuilder {
            balances: Balances::default(),
            holds: Balances::default(),
            markets: Vec::new(),
            prices: FxHashMap::default(),
            open_orders: Vec::new(),
            trades: Vec::new(),
            failing: FxHashSet::default(),
            failing_once: FxHashSet::default(),
            rejections: FxHashMap::default(),
        }
    }

    /// Toggle failure injection for `op` at runtime.
    pub fn set_failing(&self, op: Operation, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    /// Replace an available balance at runtime.
    pub fn set_balance(&self, currency: &str, amount: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert(currency.to_string(), amount);
    }

    /// Append a trade, as if an order had just filled.
    pub fn push_trade(&self, trade: TradeRecord) {
        self.trades.lock().unwrap().push(trade);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.calls.lock().unwrap().iter().filter(|&&c| c == op).count()
    }

    /// Orders accepted by `place_order` (rejections excluded).
    pub fn placed_orders(&self) -> Vec<NewOrder> {
        self.placed.lock().unwrap().clone()
    }

    /// Forget recorded calls and placements.
    pub fn clear_history(&self) {
        self.calls.lock().unwrap().clear();
        self.placed.lock().unwrap().clear();
    }

    fn enter(&self, op: Operation) -> Result<(), ExchangeError> {
        self.calls.lock().unwrap().push(op);
        if !self.connected {
            return Err(ExchangeError::NotConnected);
        }
        if self.failing_once.lock().unwrap().remove(&op)
            || self.failing.lock().unwrap().contains(&op)
        {
            return Err(ExchangeError::Connection(format!("mock: {op:?} failed")));
        }
        Ok(())
    }
}

impl Exchange for MockExchange {
    fn connect(&mut self) -> Result<(), ExchangeError> {
        self.connected = true;
        Ok(())
    }

    fn balances(&self) -> Result<Balances, ExchangeError> {
        self.enter(Operation::Balances)?;
        Ok(self.balances.lock().unwrap().clone())
    }

    fn balances_merged(&self) -> Result<Balances, ExchangeError> {
        self.enter(Operation::BalancesMerged)?;
        let mut merged = self.balances.lock().unwrap().clone();
        for (currency, &held) in &self.holds {
            *merged.entry(currency.clone()).or_insert(Decimal::ZERO) += held;
        }
        Ok(merged)
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.enter(Operation::OpenOrders)?;
        Ok(self.open_orders.lock().unwrap().clone())
    }

    fn market(&self, market: &str) -> Result<MarketInfo, ExchangeError> {
        self.enter(Operation::Market)?;
        self.markets
            .iter()
            .find(|m| m.pair.to_string() == market)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownMarket(market.to_string()))
    }

    fn currency_price(&self, code: &str) -> Result<Decimal, ExchangeError> {
        self.enter(Operation::CurrencyPrice)?;
        self.prices
            .get(code)
            .copied()
            .ok_or_else(|| ExchangeError::Other(format!("mock: no price for {code}")))
    }

    fn place_order(&self, order: &NewOrder) -> Result<OrderId, ExchangeError> {
        self.enter(Operation::PlaceOrder)?;

        if let Some(&code) = self.rejections.get(&order.market) {
            return Err(ExchangeError::Api {
                code,
                message: format!("mock: order on {} rejected", order.market),
            });
        }

        let mut next = self.next_order_id.lock().unwrap();
        let id = *next;
        *next += 1;

        let remaining = match order.quantity {
            OrderQuantity::Amount(amount) => amount,
            OrderQuantity::Value(value) if !order.price.is_zero() => value / order.price,
            OrderQuantity::Value(_) => Decimal::ZERO,
        };
        self.open_orders.lock().unwrap().push(OpenOrder {
            id,
            market: order.market.clone(),
            side: order.side,
            price: order.price,
            market_amount_remaining: remaining,
        });
        self.placed.lock().unwrap().push(order.clone());
        Ok(OrderId(id))
    }

    fn cancel_all_orders(&self) -> Result<(), ExchangeError> {
        self.enter(Operation::CancelAll)?;
        self.open_orders.lock().unwrap().clear();
        Ok(())
    }

    fn trades(&self, newer_than: Option<u64>) -> Result<Vec<TradeRecord>, ExchangeError> {
        self.enter(Operation::Trades)?;
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .filter(|t| newer_than.is_none_or(|n| t.id > n))
            .cloned()
            .collect())
    }
}

/// A ticker feed serving fixed quotes.
pub struct StaticFeed {
    name: String,
    quotes: Mutex<FxHashMap<String, Quote>>,
    failing: AtomicBool,
}

impl StaticFeed {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            quotes: Mutex::new(FxHashMap::default()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn with_quote(self, market: &str, bid: Decimal, ask: Decimal) -> Self {
        self.set_quote(market, bid, ask);
        self
    }

    pub fn set_quote(&self, market: &str, bid: Decimal, ask: Decimal) {
        self.quotes
            .lock()
            .unwrap()
            .insert(market.to_string(), Quote::new(bid, ask));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl TickerFeed for StaticFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<FxHashMap<String, Quote>, ExchangeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExchangeError::Connection(format!("mock: {} feed down", self.name)));
        }
        Ok(self.quotes.lock().unwrap().clone())
    }
}

/// A trade with unit price and amounts, for tests that only care about ids.
pub fn trade(id: u64, market: &str, side: Side) -> TradeRecord {
    TradeRecord {
        id,
        market: market.to_string(),
        side,
        price: Decimal::ONE,
        market_amount: Decimal::ONE,
        base_amount: Decimal::ONE,
        created_at: chrono::DateTime::<chrono::Utc>::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn connected(builder: MockExchangeBuilder) -> MockExchange {
        let mut exchange = builder.build();
        exchange.connect().unwrap();
        exchange
    }

    #[test]
    fn builder_basic() {
        let exchange = connected(
            MockExchange::builder()
                .with_balance("BTC", dec!(1.0))
                .with_hold("BTC", dec!(0.2))
                .with_hold("DOGE", dec!(500))
                .with_market(36, "DOGE_BTC")
                .with_btc_price(dec!(10000)),
        );

        assert_eq!(exchange.balances().unwrap()["BTC"], dec!(1.0));
        let merged = exchange.balances_merged().unwrap();
        assert_eq!(merged["BTC"], dec!(1.2));
        assert_eq!(merged["DOGE"], dec!(500));

        assert_eq!(exchange.market("DOGE_BTC").unwrap().id, 36);
        assert!(matches!(
            exchange.market("LTC_BTC"),
            Err(ExchangeError::UnknownMarket(_))
        ));
        assert_eq!(exchange.currency_price("BTC").unwrap(), dec!(10000));
    }

    #[test]
    fn not_connected_errors() {
        let exchange = MockExchange::builder().build();
        assert!(matches!(exchange.balances(), Err(ExchangeError::NotConnected)));
        assert!(exchange.cancel_all_orders().is_err());
    }

    #[test]
    fn place_records_and_rests() {
        let exchange = connected(MockExchange::builder());
        let order = NewOrder::limit(Side::Sell, "DOGE_BTC", dec!(0.00000333), dec!(1250));

        assert_eq!(exchange.place_order(&order).unwrap(), OrderId(1));
        assert_eq!(exchange.placed_orders(), vec![order]);

        let open = exchange.open_orders().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].market_amount_remaining, dec!(1250));

        exchange.cancel_all_orders().unwrap();
        assert!(exchange.open_orders().unwrap().is_empty());
        assert_eq!(exchange.call_count(Operation::CancelAll), 1);
    }

    #[test]
    fn rejected_market_returns_api_code() {
        let exchange = connected(MockExchange::builder().reject_market("DOGE_BTC", 400));
        let order = NewOrder::limit(Side::Buy, "DOGE_BTC", dec!(0.00000317), dec!(0.25));

        let err = exchange.place_order(&order).unwrap_err();
        assert!(err.is_validation());
        assert!(exchange.placed_orders().is_empty());
    }

    #[test]
    fn failure_injection_toggles() {
        let exchange = connected(MockExchange::builder().fail_on(Operation::Balances));
        assert!(matches!(exchange.balances(), Err(ExchangeError::Connection(_))));

        exchange.set_failing(Operation::Balances, false);
        assert!(exchange.balances().is_ok());
        assert_eq!(exchange.call_count(Operation::Balances), 2);
    }

    #[test]
    fn fail_once_heals_itself() {
        let exchange = connected(MockExchange::builder().fail_once(Operation::Trades));
        assert!(exchange.trades(None).is_err());
        assert!(exchange.trades(None).is_ok());
    }

    #[test]
    fn trades_newer_than() {
        let exchange = connected(
            MockExchange::builder()
                .with_trade(trade(42, "DOGE_BTC", Side::Buy))
                .with_trade(trade(45, "DOGE_BTC", Side::Sell)),
        );
        assert_eq!(exchange.trades(None).unwrap().len(), 2);
        let newer = exchange.trades(Some(42)).unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, 45);
        assert!(exchange.trades(Some(45)).unwrap().is_empty());
    }

    #[test]
    fn static_feed() {
        let feed =
            StaticFeed::new("qtrade").with_quote("DOGE_BTC", dec!(0.0000032), dec!(0.0000033));
        assert_eq!(feed.name(), "qtrade");
        assert_eq!(feed.fetch().unwrap()["DOGE_BTC"].ask, dec!(0.0000033));

        feed.set_failing(true);
        assert!(feed.fetch().is_err());
    }
}

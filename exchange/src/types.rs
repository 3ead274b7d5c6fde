//! Shared exchange types: markets, open orders, new orders, trades.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lpbot::{Ladder, MarketPair, Side};
use rust_decimal::Decimal;

/// Exchange metadata for one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketInfo {
    /// Exchange-internal market id.
    pub id: u64,
    pub pair: MarketPair,
}

impl MarketInfo {
    pub fn new(id: u64, pair: MarketPair) -> Self {
        Self { id, pair }
    }
}

/// An order resting on the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    pub id: u64,
    /// Market string, e.g. `DOGE_BTC`.
    pub market: String,
    pub side: Side,
    pub price: Decimal,
    pub market_amount_remaining: Decimal,
}

impl OpenOrder {
    /// Base-currency value of the unfilled remainder.
    pub fn base_amount(&self) -> Decimal {
        self.price * self.market_amount_remaining
    }
}

/// How much a limit order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQuantity {
    /// Base-currency value to spend (buy orders).
    Value(Decimal),
    /// Market-currency amount to sell (sell orders).
    Amount(Decimal),
}

impl OrderQuantity {
    pub fn as_decimal(self) -> Decimal {
        match self {
            OrderQuantity::Value(v) | OrderQuantity::Amount(v) => v,
        }
    }
}

/// A limit order to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub side: Side,
    pub market: String,
    pub price: Decimal,
    pub quantity: OrderQuantity,
}

impl NewOrder {
    /// Build a limit order. Buy quantities are base-currency values, sell
    /// quantities market-currency amounts.
    pub fn limit(side: Side, market: &str, price: Decimal, quantity: Decimal) -> Self {
        let quantity = match side {
            Side::Buy => OrderQuantity::Value(quantity),
            Side::Sell => OrderQuantity::Amount(quantity),
        };
        Self {
            side,
            market: market.to_string(),
            price,
            quantity,
        }
    }
}

/// Opaque order ID returned by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

/// A fill on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    pub id: u64,
    pub market: String,
    pub side: Side,
    pub price: Decimal,
    pub market_amount: Decimal,
    pub base_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Open orders grouped by market, then side.
#[derive(Debug, Clone, Default)]
pub struct OpenOrderBook {
    markets: BTreeMap<String, Ladder<OpenOrder>>,
}

impl OpenOrderBook {
    pub fn from_orders(orders: impl IntoIterator<Item = OpenOrder>) -> Self {
        let mut markets: BTreeMap<String, Ladder<OpenOrder>> = BTreeMap::new();
        for order in orders {
            let ladder = markets.entry(order.market.clone()).or_default();
            match order.side {
                Side::Buy => ladder.buy_limit.push(order),
                Side::Sell => ladder.sell_limit.push(order),
            }
        }
        Self { markets }
    }

    pub fn market(&self, market: &str) -> Option<&Ladder<OpenOrder>> {
        self.markets.get(market)
    }

    pub fn markets(&self) -> impl Iterator<Item = (&str, &Ladder<OpenOrder>)> {
        self.markets.iter().map(|(m, l)| (m.as_str(), l))
    }

    pub fn count(&self, side: Side) -> usize {
        self.markets.values().map(|l| l.side(side).len()).sum()
    }

    /// Orders across every market and side.
    pub fn len(&self) -> usize {
        self.count(Side::Buy) + self.count(Side::Sell)
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

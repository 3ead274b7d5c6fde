//! qTrade-specific API response types.
//!
//! Every response is wrapped in a `{"data": ...}` envelope. Decimal fields
//! arrive as strings.

use chrono::{DateTime, Utc};
use lpbot::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Error body of a non-success response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    pub code: String,
    #[serde(default)]
    pub title: String,
}

/// `GET /v1/user/me`
#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user: UserInfo,
}

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub id: u64,
    #[serde(default)]
    pub can_trade: bool,
}

/// One currency balance.
#[derive(Debug, Deserialize)]
pub struct BalanceEntry {
    pub currency: String,
    pub balance: Decimal,
}

/// `GET /v1/user/balances_all`: free balances and order holds.
#[derive(Debug, Deserialize)]
pub struct BalancesAll {
    pub balances: Vec<BalanceEntry>,
    #[serde(default)]
    pub order_balances: Vec<BalanceEntry>,
}

/// `GET /v1/markets`
#[derive(Debug, Deserialize)]
pub struct MarketsData {
    pub markets: Vec<MarketData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketData {
    pub id: u64,
    pub market_currency: String,
    pub base_currency: String,
    #[serde(default = "default_true")]
    pub can_trade: bool,
}

fn default_true() -> bool {
    true
}

/// `GET /v1/user/orders`
#[derive(Debug, Deserialize)]
pub struct OrdersData {
    pub orders: Vec<OrderData>,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub id: u64,
    pub market_id: u64,
    pub order_type: String,
    pub price: Decimal,
    pub market_amount_remaining: Decimal,
    pub open: bool,
}

impl OrderData {
    /// Side of a limit order; `None` for any other order type.
    pub fn side(&self) -> Option<Side> {
        match self.order_type.as_str() {
            "buy_limit" => Some(Side::Buy),
            "sell_limit" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// `GET /v1/currency/{code}`
#[derive(Debug, Deserialize)]
pub struct CurrencyData {
    pub currency: CurrencyInfo,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyInfo {
    pub code: String,
    pub config: CurrencyConfig,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyConfig {
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Body of `POST /v1/user/{buy_limit,sell_limit}`.
#[derive(Debug, Serialize)]
pub struct LimitOrderRequest {
    pub market_id: u64,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub prevent_taker: bool,
}

/// Body of `POST /v1/user/cancel_order`.
#[derive(Debug, Serialize)]
pub struct CancelOrderRequest {
    pub id: u64,
}

/// Response of an order placement.
#[derive(Debug, Deserialize)]
pub struct PlacedOrderData {
    pub order: PlacedOrder,
}

#[derive(Debug, Deserialize)]
pub struct PlacedOrder {
    pub id: u64,
}

/// `GET /v1/user/trades`
#[derive(Debug, Deserialize)]
pub struct TradesData {
    pub trades: Vec<TradeData>,
}

#[derive(Debug, Deserialize)]
pub struct TradeData {
    pub id: u64,
    pub market_string: String,
    pub side: Side,
    pub price: Decimal,
    pub market_amount: Decimal,
    pub base_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// `GET /v1/tickers`
#[derive(Debug, Deserialize)]
pub struct TickersData {
    pub markets: Vec<TickerData>,
}

/// One market ticker. Bid or ask is null on an empty book side.
#[derive(Debug, Deserialize)]
pub struct TickerData {
    pub id_hr: String,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
}

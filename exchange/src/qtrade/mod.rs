//! qTrade exchange and ticker feed.

pub mod auth;
pub mod client;
pub mod types;

use lpbot::{Balances, MarketPair, Quote};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::error::ExchangeError;
use crate::types::*;
use crate::{Exchange, TickerFeed};
use auth::Credentials;
use client::QtradeClient;
use types::{
    BalanceEntry, BalancesAll, CancelOrderRequest, CurrencyData, LimitOrderRequest, MarketsData,
    OrdersData, PlacedOrderData, TickersData, TradesData, UserData,
};

/// qTrade account implementing the `Exchange` trait.
///
/// Uses the REST API for all operations. Blocking (sync) via reqwest::blocking.
/// Market metadata is loaded once on `connect`.
pub struct QtradeExchange {
    endpoint: String,
    credentials: Credentials,
    client: Option<QtradeClient>,
    markets_by_name: FxHashMap<String, MarketInfo>,
    markets_by_id: FxHashMap<u64, String>,
}

impl QtradeExchange {
    /// Create a handle (not yet connected).
    pub fn new(endpoint: &str, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            credentials,
            client: None,
            markets_by_name: FxHashMap::default(),
            markets_by_id: FxHashMap::default(),
        }
    }

    fn require_client(&self) -> Result<&QtradeClient, ExchangeError> {
        self.client.as_ref().ok_or(ExchangeError::NotConnected)
    }

    fn market_name(&self, id: u64) -> Result<&str, ExchangeError> {
        self.markets_by_id
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| ExchangeError::UnknownMarket(format!("market id {id}")))
    }

    fn load_markets(&mut self, client: &QtradeClient) -> Result<(), ExchangeError> {
        let data: MarketsData = client.get("/v1/markets", &[])?;
        self.markets_by_name.clear();
        self.markets_by_id.clear();
        for m in data.markets {
            let pair = MarketPair::new(&m.market_currency, &m.base_currency);
            let name = pair.to_string();
            if !m.can_trade {
                debug!("{name} is not tradeable");
            }
            self.markets_by_id.insert(m.id, name.clone());
            self.markets_by_name.insert(name, MarketInfo::new(m.id, pair));
        }
        Ok(())
    }
}

fn to_balances(entries: impl IntoIterator<Item = BalanceEntry>) -> Balances {
    let mut balances = Balances::default();
    for e in entries {
        *balances.entry(e.currency).or_insert(Decimal::ZERO) += e.balance;
    }
    balances
}

impl Exchange for QtradeExchange {
    fn connect(&mut self) -> Result<(), ExchangeError> {
        let client = QtradeClient::new(&self.endpoint, self.credentials.clone())?;

        let me: UserData = client.get("/v1/user/me", &[])?;
        if !me.user.can_trade {
            warn!("qTrade user {} cannot trade", me.user.id);
        }
        self.load_markets(&client)?;
        info!(
            "Connected to {} as user {} ({} markets)",
            self.endpoint,
            me.user.id,
            self.markets_by_name.len()
        );
        self.client = Some(client);
        Ok(())
    }

    fn balances(&self) -> Result<Balances, ExchangeError> {
        let all: BalancesAll = self.require_client()?.get("/v1/user/balances_all", &[])?;
        Ok(to_balances(all.balances))
    }

    fn balances_merged(&self) -> Result<Balances, ExchangeError> {
        let all: BalancesAll = self.require_client()?.get("/v1/user/balances_all", &[])?;
        Ok(to_balances(all.balances.into_iter().chain(all.order_balances)))
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, ExchangeError> {
        let data: OrdersData = self
            .require_client()?
            .get("/v1/user/orders", &[("open", "true".to_string())])?;

        let mut orders = Vec::new();
        for o in data.orders.into_iter().filter(|o| o.open) {
            let Some(side) = o.side() else {
                debug!("Skipping order {} of type {}", o.id, o.order_type);
                continue;
            };
            orders.push(OpenOrder {
                id: o.id,
                market: self.market_name(o.market_id)?.to_string(),
                side,
                price: o.price,
                market_amount_remaining: o.market_amount_remaining,
            });
        }
        Ok(orders)
    }

    fn market(&self, market: &str) -> Result<MarketInfo, ExchangeError> {
        self.require_client()?;
        self.markets_by_name
            .get(market)
            .cloned()
            .ok_or_else(|| ExchangeError::UnknownMarket(market.to_string()))
    }

    fn currency_price(&self, code: &str) -> Result<Decimal, ExchangeError> {
        let data: CurrencyData = self
            .require_client()?
            .get(&format!("/v1/currency/{code}"), &[])?;
        data.currency
            .config
            .price
            .ok_or_else(|| ExchangeError::Parse(format!("no price for {}", data.currency.code)))
    }

    fn place_order(&self, order: &NewOrder) -> Result<OrderId, ExchangeError> {
        let client = self.require_client()?;
        let market = self.market(&order.market)?;
        let (value, amount) = match order.quantity {
            OrderQuantity::Value(v) => (Some(v), None),
            OrderQuantity::Amount(a) => (None, Some(a)),
        };
        let request = LimitOrderRequest {
            market_id: market.id,
            price: order.price,
            value,
            amount,
            prevent_taker: false,
        };
        let path = format!("/v1/user/{}", order.side.limit_order_type());
        let placed: PlacedOrderData = client.post(&path, &request)?;
        Ok(OrderId(placed.order.id))
    }

    fn cancel_all_orders(&self) -> Result<(), ExchangeError> {
        let client = self.require_client()?;
        let orders = self.open_orders()?;
        for o in &orders {
            client.post_unit("/v1/user/cancel_order", &CancelOrderRequest { id: o.id })?;
        }
        info!("Cancelled {} open orders", orders.len());
        Ok(())
    }

    fn trades(&self, newer_than: Option<u64>) -> Result<Vec<TradeRecord>, ExchangeError> {
        let query: Vec<(&str, String)> = newer_than
            .map(|id| vec![("newer_than", id.to_string())])
            .unwrap_or_default();
        let data: TradesData = self.require_client()?.get("/v1/user/trades", &query)?;
        Ok(data
            .trades
            .into_iter()
            .map(|t| TradeRecord {
                id: t.id,
                market: t.market_string,
                side: t.side,
                price: t.price,
                market_amount: t.market_amount,
                base_amount: t.base_amount,
                created_at: t.created_at,
            })
            .collect())
    }
}

/// Public qTrade tickers as a market-data source.
pub struct QtradeTickerFeed {
    client: QtradeClient,
}

impl QtradeTickerFeed {
    pub fn new(endpoint: &str) -> Result<Self, ExchangeError> {
        Ok(Self {
            client: QtradeClient::public(endpoint)?,
        })
    }
}

/// Collect two-sided tickers; markets missing a bid or ask are left out.
pub fn quotes_from_tickers(data: TickersData) -> FxHashMap<String, Quote> {
    data.markets
        .into_iter()
        .filter_map(|t| Some((t.id_hr, Quote::new(t.bid?, t.ask?))))
        .collect()
}

impl TickerFeed for QtradeTickerFeed {
    fn name(&self) -> &str {
        "qtrade"
    }

    fn fetch(&self) -> Result<FxHashMap<String, Quote>, ExchangeError> {
        let data: TickersData = self.client.get("/v1/tickers", &[])?;
        Ok(quotes_from_tickers(data))
    }
}

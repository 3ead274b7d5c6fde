//! Orderbook manager: one tick of allocate → price → decide → dispatch,
//! plus account valuation and trade tracking.

use log::{debug, info, warn};
use lpbot::{
    AccountValue, AllocationProfile, AllocationResult, Decision, MarketConfig, PricingPolicy,
    RebalancePolicy, Side, TickerSnapshot, TradeWatermark, Valuation, allocate_orders,
    BTC, compute_allocations, price_orders,
};
use lpbot_exchange::{Exchange, MarketDataCollector, OpenOrderBook, TradeRecord};
use rust_decimal::Decimal;

use crate::config::Config;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::Result;

/// Number of trades logged when the loop starts.
const BOOT_TRADES_SHOWN: usize = 10;

/// Result of [`OrderbookManager::generate_orders`].
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub profile: AllocationProfile,
    pub decision: Decision,
    pub outcome: DispatchOutcome,
}

/// Everything one full cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub generate: GenerateReport,
    pub value: AccountValue,
    pub gain: AccountValue,
    pub new_trades: Vec<TradeRecord>,
}

/// Drives one exchange account from a resolved configuration.
///
/// Owns the baseline profile (through its [`Dispatcher`]) and the trade
/// watermark; neither is shared.
pub struct OrderbookManager<E: Exchange> {
    exchange: E,
    collector: MarketDataCollector,
    markets: Vec<MarketConfig>,
    policy: RebalancePolicy,
    pricing: PricingPolicy,
    cost_basis_btc: Decimal,
    dispatcher: Dispatcher,
    watermark: TradeWatermark,
    booted: bool,
}

impl<E: Exchange> OrderbookManager<E> {
    pub fn new(exchange: E, collector: MarketDataCollector, config: &Config) -> Result<Self> {
        let om = &config.orderbook_manager;
        Ok(Self {
            exchange,
            collector,
            markets: config.resolve_markets()?,
            policy: config.rebalance_policy(),
            pricing: om.pricing,
            cost_basis_btc: om.cost_basis_btc,
            dispatcher: Dispatcher::new(om.dry_run_mode),
            watermark: TradeWatermark::new(),
            booted: false,
        })
    }

    /// Connect the exchange and check every configured market exists on it.
    pub fn connect(&mut self) -> Result<()> {
        self.exchange.connect()?;
        for config in &self.markets {
            let market = config.market();
            let info = self.exchange.market(&market)?;
            debug!("{market} is market id {}", info.id);
        }
        if self.dispatcher.dry_run() {
            info!("Dry run mode: no orders will be cancelled or placed");
        }
        Ok(())
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn markets(&self) -> &[MarketConfig] {
        &self.markets
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn watermark(&self) -> TradeWatermark {
        self.watermark
    }

    /// Whether [`boot_trades`](Self::boot_trades) has succeeded.
    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn refresh_tickers(&self) -> TickerSnapshot {
        let tickers = self.collector.refresh();
        if tickers.is_empty() {
            warn!("No ticker data from any source");
        }
        tickers
    }

    /// Earmark funds per market from balances including open-order holds.
    pub fn compute_allocations(&self) -> Result<AllocationResult> {
        let balances = self.exchange.balances_merged()?;
        Ok(compute_allocations(
            &balances,
            &self.policy.reserves,
            &self.markets,
        ))
    }

    /// Price every market's tier ladders. Markets without a quote in any
    /// source are left out of the profile.
    pub fn build_profile(
        &self,
        allocations: &AllocationResult,
        tickers: &TickerSnapshot,
    ) -> AllocationProfile {
        let mut profile = AllocationProfile::new();
        for config in &self.markets {
            let market = config.market();
            let Some(allocation) = allocations.get(&market) else {
                continue;
            };
            let Some((source, quote)) = tickers.quote(&market) else {
                warn!("No ticker for {market}; skipping it this cycle");
                continue;
            };
            debug!(
                "{market}: bid {} ask {} from {source}; {} {} / {} {} allocated",
                quote.bid,
                quote.ask,
                allocation.market_amount,
                config.pair.market,
                allocation.base_amount,
                config.pair.base,
            );
            let tiers = allocate_orders(allocation.market_amount, allocation.base_amount, config);
            profile.insert(market, price_orders(&tiers, &quote, self.pricing));
        }
        profile
    }

    /// Fetch the resting orders and log how many there are per side.
    pub fn open_order_book(&self) -> Result<OpenOrderBook> {
        let book = OpenOrderBook::from_orders(self.exchange.open_orders()?);
        info!(
            "Active buy orders: {}, active sell orders: {}",
            book.count(Side::Buy),
            book.count(Side::Sell)
        );
        Ok(book)
    }

    /// USD price of one BTC, or `None` if the exchange has no usable one.
    pub fn btc_usd(&self) -> Option<Decimal> {
        match self.exchange.currency_price(BTC) {
            Ok(price) if price > Decimal::ZERO => Some(price),
            Ok(price) => {
                warn!("BTC price is {price}; reporting in BTC only");
                None
            }
            Err(e) => {
                warn!("No BTC price ({e}); reporting in BTC only");
                None
            }
        }
    }

    /// Valuation over `tickers` at the current BTC/USD rate, if any.
    pub fn valuation<'a>(&self, tickers: &'a TickerSnapshot) -> Valuation<'a> {
        match self.btc_usd() {
            Some(rate) => Valuation::new(tickers, rate),
            None => Valuation::btc_only(tickers),
        }
    }

    /// Build the current profile, decide, and dispatch if needed.
    ///
    /// `force` dispatches even when every tolerance holds.
    pub fn generate_orders(
        &mut self,
        tickers: &TickerSnapshot,
        valuation: &Valuation<'_>,
        force: bool,
    ) -> Result<GenerateReport> {
        let allocations = self.compute_allocations()?;
        let profile = self.build_profile(&allocations, tickers);
        if let Err(e) = self.open_order_book() {
            warn!("Could not fetch open orders: {e}");
        }

        let balances = self.exchange.balances()?;
        let decision = self.policy.should_rebalance(
            &profile,
            self.dispatcher.baseline(),
            &balances,
            valuation,
        );
        for currency in &decision.unpriced {
            warn!("No price for reserve currency {currency}; reserve check skipped");
        }

        match &decision.reason {
            Some(reason) => info!("Rebalancing: {reason}"),
            None if force => info!("Rebalancing: forced"),
            None => info!("Orders within tolerance; no rebalance needed"),
        }

        let outcome = self.dispatcher.dispatch(
            &self.exchange,
            &profile,
            force || decision.should_rebalance(),
        )?;
        Ok(GenerateReport {
            profile,
            decision,
            outcome,
        })
    }

    /// Value of every balance, including open-order holds.
    pub fn estimate_account_value(&self, valuation: &Valuation<'_>) -> Result<AccountValue> {
        let balances = self.exchange.balances_merged()?;
        let value = valuation.account_value(&balances);
        if !value.unpriced.is_empty() {
            warn!("No BTC price for {}; valued at zero", value.unpriced.join(", "));
        }
        info!("Account value: {value}");
        Ok(value)
    }

    /// Gain of `value_btc` over the configured cost basis.
    pub fn estimate_account_gain(
        &self,
        valuation: &Valuation<'_>,
        value_btc: Decimal,
    ) -> AccountValue {
        let gain = valuation.account_gain(value_btc, self.cost_basis_btc);
        info!("Account gain: {gain}");
        gain
    }

    /// Log the most recent trades and start the watermark at the newest.
    pub fn boot_trades(&mut self) -> Result<()> {
        let mut trades = self.exchange.trades(None)?;
        trades.sort_by(|a, b| b.id.cmp(&a.id));
        if trades.is_empty() {
            info!("No trades on the account yet");
        }
        for t in trades.iter().take(BOOT_TRADES_SHOWN) {
            log_trade("Recent trade", t);
        }
        self.watermark.observe(trades.iter().map(|t| t.id));
        self.booted = true;
        Ok(())
    }

    /// Poll for trades newer than the watermark and advance it.
    pub fn check_for_trades(&mut self) -> Result<Vec<TradeRecord>> {
        let mut trades = self.exchange.trades(self.watermark.most_recent())?;
        trades.sort_by_key(|t| t.id);
        if trades.is_empty() {
            info!("No new trades!");
        } else if !self.dispatcher.dry_run() {
            for t in &trades {
                log_trade("New trade", t);
            }
        }
        self.watermark.observe(trades.iter().map(|t| t.id));
        Ok(trades)
    }

    /// Cancel every resting order. The baseline no longer describes the book.
    pub fn cancel_all(&mut self) -> Result<()> {
        self.dispatcher.invalidate();
        self.exchange.cancel_all_orders()?;
        Ok(())
    }

    /// One full tick: tickers, orders, value, gain, trades.
    pub fn run_cycle(&mut self, force: bool) -> Result<CycleReport> {
        let tickers = self.refresh_tickers();
        let valuation = self.valuation(&tickers);

        let generate = self.generate_orders(&tickers, &valuation, force)?;
        let value = self.estimate_account_value(&valuation)?;
        let gain = self.estimate_account_gain(&valuation, value.btc);
        let new_trades = self.check_for_trades()?;

        Ok(CycleReport {
            generate,
            value,
            gain,
            new_trades,
        })
    }
}

fn log_trade(label: &str, t: &TradeRecord) {
    info!(
        "{label} {}: {} {} {} @ {} for {} ({})",
        t.id,
        t.side,
        t.market_amount,
        t.market,
        t.price,
        t.base_amount,
        t.created_at.format("%Y-%m-%d %H:%M:%S"),
    );
}

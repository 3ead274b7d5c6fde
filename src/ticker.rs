//! Read-only ticker snapshot, refreshed once per tick.
//!
//! Sources are kept in priority order; a lookup returns the quote from the
//! first source that has the market.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::types::Quote;

/// Quotes from every configured data source at one point in time.
#[derive(Clone, Debug, Default)]
pub struct TickerSnapshot {
    sources: Vec<(String, FxHashMap<String, Quote>)>,
}

impl TickerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source at the lowest priority so far.
    pub fn push_source(&mut self, name: impl Into<String>, quotes: FxHashMap<String, Quote>) {
        self.sources.push((name.into(), quotes));
    }

    /// Builder form of [`push_source`](Self::push_source).
    pub fn with_source(
        mut self,
        name: impl Into<String>,
        quotes: FxHashMap<String, Quote>,
    ) -> Self {
        self.push_source(name, quotes);
        self
    }

    /// First quote for `market` in priority order, with the source it came from.
    pub fn quote(&self, market: &str) -> Option<(&str, Quote)> {
        self.sources
            .iter()
            .find_map(|(name, quotes)| quotes.get(market).map(|q| (name.as_str(), *q)))
    }

    /// Best bid for `market`, by source priority.
    pub fn bid(&self, market: &str) -> Option<Decimal> {
        self.quote(market).map(|(_, q)| q.bid)
    }

    /// Source names, highest priority first.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(name, _)| name.as_str())
    }

    /// Number of distinct markets quoted across all sources.
    pub fn market_count(&self) -> usize {
        let mut markets: Vec<&str> = self
            .sources
            .iter()
            .flat_map(|(_, quotes)| quotes.keys().map(String::as_str))
            .collect();
        markets.sort_unstable();
        markets.dedup();
        markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|(_, quotes)| quotes.is_empty())
    }
}

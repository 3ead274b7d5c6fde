//! Builds one `TickerSnapshot` per tick from the configured feeds.

use std::fmt;

use log::{debug, warn};
use lpbot::TickerSnapshot;

use crate::TickerFeed;

/// Queries ticker feeds in priority order.
#[derive(Default)]
pub struct MarketDataCollector {
    feeds: Vec<Box<dyn TickerFeed>>,
}

impl fmt::Debug for MarketDataCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.feeds.iter().map(|feed| feed.name()))
            .finish()
    }
}

impl MarketDataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feed at the lowest priority so far.
    pub fn with_feed(mut self, feed: impl TickerFeed + 'static) -> Self {
        self.feeds.push(Box::new(feed));
        self
    }

    pub fn push(&mut self, feed: Box<dyn TickerFeed>) {
        self.feeds.push(feed);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Fetch every feed. A feed that fails is logged and left out of the
    /// snapshot; lookups fall through to the next source.
    pub fn refresh(&self) -> TickerSnapshot {
        let mut snapshot = TickerSnapshot::new();
        for feed in &self.feeds {
            match feed.fetch() {
                Ok(quotes) => {
                    debug!("{}: {} tickers", feed.name(), quotes.len());
                    snapshot.push_source(feed.name(), quotes);
                }
                Err(e) => warn!("Ticker feed {} failed: {e}", feed.name()),
            }
        }
        snapshot
    }
}

//! Builds the live exchange and market-data collector from config.

use lpbot_exchange::MarketDataCollector;
use lpbot_exchange::qtrade::auth::Credentials;
use lpbot_exchange::qtrade::{QtradeExchange, QtradeTickerFeed};

use crate::config::Config;
use crate::error::{Error, Result};

/// One feed per configured source, in priority order.
pub fn collector(config: &Config) -> Result<MarketDataCollector> {
    let mut collector = MarketDataCollector::new();
    for source in &config.market_data.sources {
        match source.as_str() {
            "qtrade" => {
                collector.push(Box::new(QtradeTickerFeed::new(&config.exchange.endpoint)?));
            }
            other => {
                return Err(Error::Config(format!("unknown market data source '{other}'")));
            }
        }
    }
    Ok(collector)
}

/// Unconnected qTrade account handle.
pub fn exchange(config: &Config, credentials: Credentials) -> QtradeExchange {
    QtradeExchange::new(&config.exchange.endpoint, credentials)
}

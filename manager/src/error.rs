//! Error types for the orderbook manager.

use std::path::PathBuf;

use lpbot_exchange::ExchangeError;

/// All errors that can occur while managing the orderbook.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("market config error: {0}")]
    Engine(#[from] lpbot::Error),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, Error>;

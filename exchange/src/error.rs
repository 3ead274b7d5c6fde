//! Exchange error types.

/// Errors that can occur during exchange operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("connection error: {0}")]
    Connection(String),

    /// The exchange answered with a non-success status.
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("not connected")]
    NotConnected,

    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("{0}")]
    Other(String),
}

impl ExchangeError {
    /// True for a per-order validation rejection (HTTP 400), which does not
    /// invalidate the rest of a placement batch.
    pub fn is_validation(&self) -> bool {
        matches!(self, ExchangeError::Api { code: 400, .. })
    }
}

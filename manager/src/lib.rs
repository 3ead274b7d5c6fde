//! lpbot-manager: runs the lpbot engine against a live exchange account.
//!
//! Loads the TOML config, builds the priced order profile each tick,
//! replaces resting orders when it drifts past tolerance, and tracks the
//! account's value and trades.

pub mod commands;
pub mod config;
pub mod connect;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod orderbook;

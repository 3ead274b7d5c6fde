//! One-shot CLI commands over a connected [`OrderbookManager`].

use log::info;
use lpbot::AllocationProfile;
use lpbot_exchange::Exchange;
use rust_decimal::Decimal;

use crate::dispatcher::DispatchOutcome;
use crate::error::{Error, Result};
use crate::orderbook::OrderbookManager;

/// Show available and total (including open-order holds) balances.
pub fn show_balances<E: Exchange>(manager: &OrderbookManager<E>) -> Result<()> {
    let available = manager.exchange().balances()?;
    let merged = manager.exchange().balances_merged()?;

    let mut currencies: Vec<&String> = merged.keys().collect();
    currencies.sort();
    if currencies.is_empty() {
        println!("No balances.");
        return Ok(());
    }

    println!("  {:8} {:>20} {:>20}", "Currency", "Available", "Total");
    for currency in currencies {
        println!(
            "  {:8} {:>20} {:>20}",
            currency,
            available.get(currency).copied().unwrap_or(Decimal::ZERO),
            merged[currency],
        );
    }
    Ok(())
}

/// Show the amounts earmarked for every configured market.
pub fn show_allocations<E: Exchange>(manager: &OrderbookManager<E>, json: bool) -> Result<()> {
    let allocations = manager.compute_allocations()?;
    if json {
        println!("{}", to_json(&allocations)?);
        return Ok(());
    }

    println!("  {:12} {:>20} {:>20}", "Market", "Market amount", "Base amount");
    for (market, a) in &allocations {
        println!("  {:12} {:>20} {:>20}", market, a.market_amount, a.base_amount);
    }
    Ok(())
}

/// Show the priced order profile without dispatching it.
pub fn show_orders<E: Exchange>(manager: &OrderbookManager<E>, json: bool) -> Result<()> {
    let tickers = manager.refresh_tickers();
    let allocations = manager.compute_allocations()?;
    let profile = manager.build_profile(&allocations, &tickers);
    if json {
        println!("{}", to_json(&profile)?);
    } else {
        display_profile(&profile);
    }
    Ok(())
}

/// One generate-and-dispatch pass.
pub fn rebalance<E: Exchange>(manager: &mut OrderbookManager<E>, force: bool) -> Result<()> {
    let tickers = manager.refresh_tickers();
    let valuation = manager.valuation(&tickers);
    let report = manager.generate_orders(&tickers, &valuation, force)?;

    display_profile(&report.profile);
    match report.outcome {
        DispatchOutcome::Skipped => println!("\nNo rebalance needed."),
        DispatchOutcome::DryRun { orders } => {
            println!("\n[DRY RUN] {orders} orders not sent.")
        }
        DispatchOutcome::Dispatched { placed, rejected } => {
            println!("\n{placed} orders placed, {rejected} rejected.")
        }
    }
    Ok(())
}

/// Cancel every open order, asking first unless `yes`.
///
/// In dry run mode only reports what would be cancelled.
pub fn cancel_all<E: Exchange>(manager: &mut OrderbookManager<E>, yes: bool) -> Result<()> {
    let book = manager.open_order_book()?;
    if book.is_empty() {
        println!("No open orders.");
        return Ok(());
    }
    if manager.dispatcher().dry_run() {
        info!("[DRY RUN] would cancel {} open orders", book.len());
        println!("[DRY RUN] {} open orders not cancelled.", book.len());
        return Ok(());
    }

    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Cancel all open orders?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
        if !confirmed {
            return Err(Error::Aborted("Aborted.".into()));
        }
    }

    manager.cancel_all()?;
    println!("All open orders cancelled.");
    Ok(())
}

/// Show the account's value in BTC, and in USD when a rate is available.
pub fn show_value<E: Exchange>(manager: &OrderbookManager<E>) -> Result<()> {
    let tickers = manager.refresh_tickers();
    let valuation = manager.valuation(&tickers);
    let value = manager.estimate_account_value(&valuation)?;
    println!("Account value: {value}");
    if !value.unpriced.is_empty() {
        println!("Not priced: {}", value.unpriced.join(", "));
    }
    Ok(())
}

/// Show the gain over the configured cost basis.
pub fn show_gain<E: Exchange>(manager: &OrderbookManager<E>) -> Result<()> {
    let tickers = manager.refresh_tickers();
    let valuation = manager.valuation(&tickers);
    let value = manager.estimate_account_value(&valuation)?;
    let gain = manager.estimate_account_gain(&valuation, value.btc);
    println!("Account gain: {gain}");
    Ok(())
}

/// Show the `limit` most recent trades.
pub fn show_trades<E: Exchange>(manager: &OrderbookManager<E>, limit: usize) -> Result<()> {
    let mut trades = manager.exchange().trades(None)?;
    trades.sort_by(|a, b| b.id.cmp(&a.id));
    if trades.is_empty() {
        println!("No trades.");
        return Ok(());
    }
    info!("{} trades on the account", trades.len());

    for t in trades.iter().take(limit) {
        println!(
            "  {:>8}  {}  {:4} {:12} {:>18} @ {:>12}  = {}",
            t.id,
            t.created_at.format("%Y-%m-%d %H:%M:%S"),
            t.side,
            t.market,
            t.market_amount,
            t.price,
            t.base_amount,
        );
    }
    Ok(())
}

fn display_profile(profile: &AllocationProfile) {
    if profile.is_empty() {
        println!("No priced markets.");
        return;
    }
    for (market, ladder) in profile {
        println!("{market}:");
        for (label, orders) in [("BUY", &ladder.buy_limit), ("SELL", &ladder.sell_limit)] {
            for (i, o) in orders.iter().enumerate() {
                println!("  {label:4} {:>2}  {:>18} @ {:>12}", i + 1, o.quantity, o.price);
            }
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

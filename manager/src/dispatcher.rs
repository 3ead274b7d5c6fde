//! Order dispatcher: cancel everything resting, place the new profile.
//!
//! Cancellation strictly precedes placement. A validation rejection (code
//! 400) on one order is logged and the batch carries on; anything else
//! aborts the pass and propagates to the caller.

use log::{info, warn};
use lpbot::{AllocationProfile, PricedOrder, Side};
use lpbot_exchange::{Exchange, NewOrder};

use crate::error::Result;

/// What one dispatch pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No rebalance was called for; nothing touched.
    Skipped,
    /// Dry run: `orders` would have been placed.
    DryRun { orders: usize },
    /// Orders replaced. `rejected` counts validation rejections.
    Dispatched { placed: usize, rejected: usize },
}

/// Owns the baseline profile: the last one actually sent to the exchange.
#[derive(Debug, Default)]
pub struct Dispatcher {
    dry_run: bool,
    baseline: Option<AllocationProfile>,
}

impl Dispatcher {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            baseline: None,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Profile the resting orders were placed from, if known.
    pub fn baseline(&self) -> Option<&AllocationProfile> {
        self.baseline.as_ref()
    }

    /// Forget the baseline; the next evaluation will rebalance.
    pub fn invalidate(&mut self) {
        self.baseline = None;
    }

    /// Replace the resting orders with `profile` when `rebalance` is set.
    pub fn dispatch<E: Exchange>(
        &mut self,
        exchange: &E,
        profile: &AllocationProfile,
        rebalance: bool,
    ) -> Result<DispatchOutcome> {
        if !rebalance {
            return Ok(DispatchOutcome::Skipped);
        }

        if self.dry_run {
            let mut orders = 0;
            for_each_order(profile, |market, side, order| {
                info!(
                    "[DRY RUN] would place {side} {market}: {} @ {}",
                    order.quantity, order.price
                );
                orders += 1;
            });
            info!("[DRY RUN] {orders} orders not sent");
            return Ok(DispatchOutcome::DryRun { orders });
        }

        // Once cancel-all starts the resting orders no longer match any profile.
        self.baseline = None;
        exchange.cancel_all_orders()?;

        let mut placed = 0;
        let mut rejected = 0;
        let mut failure = None;
        for_each_order(profile, |market, side, order| {
            if failure.is_some() {
                return;
            }
            match place_order(exchange, market, side, order) {
                Ok(true) => placed += 1,
                Ok(false) => rejected += 1,
                Err(e) => failure = Some(e),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }

        info!("Placed {placed} orders ({rejected} rejected)");
        self.baseline = Some(profile.clone());
        Ok(DispatchOutcome::Dispatched { placed, rejected })
    }
}

/// Visit every order with a positive quantity, market by market, buys first.
fn for_each_order(profile: &AllocationProfile, mut f: impl FnMut(&str, Side, &PricedOrder)) {
    for (market, ladder) in profile {
        for side in [Side::Buy, Side::Sell] {
            for order in ladder.side(side) {
                if order.quantity > rust_decimal::Decimal::ZERO {
                    f(market, side, order);
                }
            }
        }
    }
}

/// Place one order. `Ok(false)` means the exchange rejected it as invalid.
fn place_order<E: Exchange>(
    exchange: &E,
    market: &str,
    side: Side,
    order: &PricedOrder,
) -> Result<bool> {
    let request = NewOrder::limit(side, market, order.price, order.quantity);
    match exchange.place_order(&request) {
        Ok(id) => {
            info!(
                "Placed {side} {market}: {} @ {} (order {})",
                order.quantity, order.price, id.0
            );
            Ok(true)
        }
        Err(e) if e.is_validation() => {
            warn!(
                "Rejected {side} {market}: {} @ {}: {e}",
                order.quantity, order.price
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

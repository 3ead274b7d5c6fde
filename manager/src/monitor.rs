//! Monitor loop: tick, sleep, repeat until shut down.
//!
//! A failed tick is logged and followed by a best-effort cancel-all, so no
//! stale orders are left resting while the loop cannot see the market. A
//! failure of that cancel is logged too and otherwise ignored; the loop
//! carries on after the usual sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use lpbot_exchange::Exchange;

use crate::config::Config;
use crate::error::Result;
use crate::orderbook::{CycleReport, OrderbookManager};

/// Longest stretch a sleep goes without looking at the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

pub struct Monitor<E: Exchange> {
    manager: OrderbookManager<E>,
    period: Duration,
    startup_delay: Duration,
}

impl<E: Exchange> Monitor<E> {
    pub fn new(manager: OrderbookManager<E>, config: &Config) -> Self {
        let om = &config.orderbook_manager;
        Self {
            manager,
            period: Duration::from_secs(om.monitor_period),
            startup_delay: Duration::from_secs(om.startup_delay_secs),
        }
    }

    pub fn manager(&self) -> &OrderbookManager<E> {
        &self.manager
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One tick. Trades are booted first if that has not succeeded yet.
    pub fn tick(&mut self) -> Result<CycleReport> {
        if !self.manager.is_booted() {
            self.manager.boot_trades()?;
        }
        self.manager.run_cycle(false)
    }

    /// Run one tick, recovering from failure. Returns whether it succeeded.
    pub fn run_once(&mut self) -> bool {
        match self.tick() {
            Ok(_) => true,
            Err(e) => {
                error!("Tick failed: {e}");
                self.cancel_after_failure();
                false
            }
        }
    }

    fn cancel_after_failure(&mut self) {
        if self.manager.dispatcher().dry_run() {
            info!("[DRY RUN] not cancelling orders after failure");
            return;
        }
        match self.manager.cancel_all() {
            Ok(()) => info!("Cancelled all orders after failed tick"),
            Err(e) => error!("Cancelling orders after failed tick also failed: {e}"),
        }
    }

    /// Run until `shutdown` is set. Sleeps end early once it is.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        self.run_with(shutdown, |d| sleep_unless(shutdown, d));
    }

    /// Run until `shutdown` is set, using `sleep` for the startup delay and
    /// between ticks. The flag is checked before every tick and every sleep.
    pub fn run_with(&mut self, shutdown: &AtomicBool, mut sleep: impl FnMut(Duration)) {
        info!(
            "Monitoring {} markets every {}s",
            self.manager.markets().len(),
            self.period.as_secs()
        );
        sleep(self.startup_delay);

        let mut ticks = 0u64;
        let mut failures = 0u64;
        while !shutdown.load(Ordering::SeqCst) {
            ticks += 1;
            if !self.run_once() {
                failures += 1;
            }
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            sleep(self.period);
        }
        info!("Monitor stopped after {ticks} ticks ({failures} failed)");
    }
}

/// Sleep for `total`, returning early once `shutdown` is set.
pub fn sleep_unless(shutdown: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !shutdown.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(SHUTDOWN_POLL));
    }
}

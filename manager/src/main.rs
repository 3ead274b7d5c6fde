//! CLI entry point for the lpbot orderbook manager.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use lpbot_exchange::qtrade::QtradeExchange;
use lpbot_exchange::qtrade::auth::Credentials;
use lpbot_manager::commands;
use lpbot_manager::config::Config;
use lpbot_manager::connect;
use lpbot_manager::error::Error;
use lpbot_manager::monitor::Monitor;
use lpbot_manager::orderbook::OrderbookManager;

#[derive(Parser)]
#[command(name = "lpbot")]
#[command(about = "Tiered market-making bot for qTrade")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override the API endpoint from the config
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Override the key file (`key_id:secret`) from the config
    #[arg(long, global = true)]
    keyfile: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor loop
    Run,

    /// Show account balances
    Balances,

    /// Show per-market allocations
    Allocations {
        #[arg(long)]
        json: bool,
    },

    /// Show the priced order profile without placing it
    Orders {
        #[arg(long)]
        json: bool,
    },

    /// Generate orders once and replace resting orders if needed
    Rebalance {
        /// Replace orders even when within tolerance
        #[arg(long)]
        force: bool,
    },

    /// Cancel every open order
    CancelAll {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show the account value in BTC and USD
    Value,

    /// Show the gain over the configured cost basis
    Gain,

    /// Show recent trades
    Trades {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Credentials::parse(&contents)
        .with_context(|| format!("invalid key file {}", path.display()))
}

fn build_manager(config: &Config) -> anyhow::Result<OrderbookManager<QtradeExchange>> {
    let credentials = load_credentials(&config.exchange.keyfile)?;
    let exchange = connect::exchange(config, credentials);
    let collector = connect::collector(config)?;
    let mut manager = OrderbookManager::new(exchange, collector, config)?;
    manager
        .connect()
        .with_context(|| format!("failed to connect to {}", config.exchange.endpoint))?;
    Ok(manager)
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Set `shutdown` on the first Ctrl+C or SIGTERM; exit on the second.
fn spawn_shutdown_listener(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;
    thread::Builder::new()
        .name("shutdown".into())
        .spawn(move || {
            runtime.block_on(wait_for_signal());
            info!("Shutdown requested; stopping after the current tick");
            shutdown.store(true, Ordering::SeqCst);
            runtime.block_on(wait_for_signal());
            warn!("Second signal; exiting now");
            process::exit(130);
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let mut manager = build_manager(&config)?;
    match cli.command {
        Command::Run => {
            let shutdown = Arc::new(AtomicBool::new(false));
            spawn_shutdown_listener(Arc::clone(&shutdown))?;
            Monitor::new(manager, &config).run(&shutdown);
            Ok(())
        }
        Command::Balances => Ok(commands::show_balances(&manager)?),
        Command::Allocations { json } => Ok(commands::show_allocations(&manager, json)?),
        Command::Orders { json } => Ok(commands::show_orders(&manager, json)?),
        Command::Rebalance { force } => Ok(commands::rebalance(&mut manager, force)?),
        Command::CancelAll { yes } => Ok(commands::cancel_all(&mut manager, yes)?),
        Command::Value => Ok(commands::show_value(&manager)?),
        Command::Gain => Ok(commands::show_gain(&manager)?),
        Command::Trades { limit } => Ok(commands::show_trades(&manager, limit)?),
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();

    let mut config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };
    if let Some(endpoint) = &cli.endpoint {
        config.exchange.endpoint = endpoint.clone();
    }
    if let Some(keyfile) = &cli.keyfile {
        config.exchange.keyfile = keyfile.clone();
    }

    if let Err(e) = run(cli, config) {
        if let Some(Error::Aborted(msg)) = e.downcast_ref::<Error>() {
            eprintln!("{msg}");
            process::exit(0);
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

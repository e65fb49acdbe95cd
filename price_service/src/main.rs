//! Price refresh daemon.
//!
//! Keeps the persistent price cache warm: it refreshes the configured watchlist right
//! away, then every `refresh_interval_secs`, and logs each update. Internally it wires:
//!
//! - `PriceFetcher` — cache-first fetcher over the file-backed cache and CoinGecko.
//! - `PriceRefresher` — background worker that publishes `PriceUpdate`s on a channel.
//! - A stdin reader — `refresh` forces a cache-bypassing refresh, `clear` drops the cache.
//!
//! Crossbeam `select!` multiplexes updates, stdin commands and the Ctrl+C signal. A
//! failed fetch never stops the daemon; it only shows up as a `Fallback` update.
//!
//! Usage:
//! ```bash
//! price_service --config price.toml --interval 60
//! ```
#![warn(missing_docs)]
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{Sender, never, select, unbounded};
use log::{error, info, warn};
use price_common::{PriceError, Result};
use price_service::{PriceFetcher, PriceRefresher, PriceUpdate, ServiceConfig};

/// Command line arguments of the daemon.
#[derive(Debug, Parser)]
#[command(name = "price_service", about = "Keeps the price cache fresh")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Override the refresh interval, in seconds.
    #[arg(long)]
    interval: Option<u64>,
}

/// Commands read from stdin.
#[derive(Debug, Clone, Copy)]
enum Command {
    Refresh,
    Clear,
}

fn main() -> Result<(), PriceError> {
    init_logger();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(interval) = args.interval {
        config.refresh_interval_secs = interval;
    }
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let fetcher = Arc::new(PriceFetcher::from_config(&config)?);
    let watchlist = config.watchlist(fetcher.mapping());
    info!(
        "Watching {} symbols in {}, cache at {}",
        watchlist.len(),
        fetcher.fiat_symbol(),
        config.cache_dir.display()
    );

    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down...");
        let _ = stop_tx.send(());
    })
    .map_err(|e| PriceError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    let (cmd_tx, cmd_rx) = unbounded::<Command>();
    let no_commands = never::<Command>();
    let mut stdin_open = true;
    thread::spawn(move || read_commands(cmd_tx));

    let (handle, updates_rx) = PriceRefresher::start(
        Arc::clone(&fetcher),
        watchlist,
        config.refresh_interval(),
        runtime.handle().clone(),
    );

    loop {
        select! {
            recv(updates_rx) -> msg => match msg {
                Ok(update) => log_update(&update, fetcher.fiat_symbol()),
                Err(e) => {
                    error!("Price refresher exited: {}", e);
                    break;
                }
            },
            recv(if stdin_open { &cmd_rx } else { &no_commands }) -> msg => match msg {
                Ok(Command::Refresh) => {
                    if handle.is_refreshing() {
                        info!("A refresh is already running; queueing another");
                    }
                    if let Err(e) = handle.refresh_now() {
                        warn!("Could not request refresh: {}", e);
                    }
                }
                Ok(Command::Clear) => {
                    fetcher.clear_cache();
                    info!("Price cache cleared");
                }
                Err(_) => stdin_open = false,
            },
            recv(stop_rx) -> _ => break,
        }
    }

    handle.shutdown()?;
    info!("Price service stopped");
    Ok(())
}

/// Forward stdin lines as commands until stdin closes.
fn read_commands(cmd_tx: Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = match line.trim() {
            "refresh" | "r" => Command::Refresh,
            "clear" => Command::Clear,
            "" => continue,
            other => {
                warn!("Unknown command '{}' (expected 'refresh' or 'clear')", other);
                continue;
            }
        };
        if cmd_tx.send(command).is_err() {
            break;
        }
    }
}

fn log_update(update: &PriceUpdate, currency: &str) {
    info!(
        "{} refresh at {}: {} quotes ({})",
        update.trigger,
        update.completed_at.format("%H:%M:%S"),
        update.snapshot.len(),
        update.outcome
    );
    for symbol in update.snapshot.sorted_symbols() {
        if let Some(quote) = update.snapshot.get(symbol) {
            info!(
                "  {:<6} {:>14.4} {} ({:+.2}%)",
                symbol, quote.price, currency, quote.change_24h
            );
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

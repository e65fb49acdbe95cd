//! Price Client — a one-shot command line client for the price cache. It resolves the
//! requested symbols through the same cache-first fetcher the service uses, so repeated
//! invocations within the cache TTL never reach the provider.
//!
//! Usage example (CLI):
//! ```bash
//! price_client btc eth eur
//! price_client --path ./symbols.txt --no-cache --json
//! price_client --clear-cache
//! ```
//!
//! The symbol file should contain symbols separated by commas, spaces, or new lines.
#![warn(missing_docs)]
mod args;
mod output;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::args::Args;
use clap::Parser;
use log::{info, warn};
use price_common::symbols::{normalize_symbol, parse_symbol_list};
use price_common::{PriceError, Result};
use price_service::{FetchOutcome, PriceFetcher, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), PriceError> {
    init_logger();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(normalize_path(path))?,
        None => ServiceConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = normalize_path(dir);
    }
    config.validate()?;

    let fetcher = PriceFetcher::from_config(&config)?;

    if args.clear_cache {
        fetcher.clear_cache();
        info!("Price cache at {} cleared", config.cache_dir.display());
    }

    let symbols = requested_symbols(&args, &fetcher)?;
    if symbols.is_empty() {
        if !args.clear_cache {
            warn!("No symbols requested. Pass symbols, --path or --all.");
        }
        return Ok(());
    }

    let (snapshot, outcome) = fetcher
        .fetch_prices_with_outcome(&symbols, !args.no_cache)
        .await;
    match outcome {
        FetchOutcome::Cached => info!(
            "Served from cache ({:.0}s old)",
            fetcher.cache().age().unwrap_or_default()
        ),
        FetchOutcome::Fetched => info!("Fetched fresh prices"),
        FetchOutcome::Fallback => warn!("Provider unavailable; showing last known prices"),
    }

    if args.json {
        println!("{}", output::render_json(&snapshot, &symbols)?);
    } else {
        print!("{}", output::render_table(&snapshot, &symbols, fetcher.fiat_symbol()));
    }
    Ok(())
}

/// Collect symbols from `--all`, the positional arguments and `--path`, without duplicates.
fn requested_symbols(args: &Args, fetcher: &PriceFetcher) -> Result<Vec<String>> {
    if args.all {
        return Ok(fetcher.all_symbols());
    }

    let mut symbols: Vec<String> = Vec::new();
    for symbol in args.symbols.iter().map(|s| normalize_symbol(s)) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    if let Some(path) = &args.path {
        let file_path = normalize_path(path);
        if !is_file_exist(&file_path) {
            return Err(PriceError::ParseSymbolsFile(format!(
                "{} is not a readable file",
                file_path.display()
            )));
        }
        let file = File::open(&file_path)?;
        for symbol in parse_symbol_list(BufReader::new(file))? {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }
    Ok(symbols)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}

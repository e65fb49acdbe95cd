//! Command-line arguments for the Price Client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Symbols to price (e.g. `BTC ETH EUR`). Case-insensitive.
    pub symbols: Vec<String>,

    /// Path to a text file with symbols to price.
    /// Symbols may be separated by commas, spaces, or new lines.
    #[clap(long)]
    pub path: Option<String>,

    /// Price every mapped symbol plus the quote currency.
    #[clap(long)]
    pub all: bool,

    /// Skip the fresh-cache shortcut and always ask the provider.
    #[clap(long)]
    pub no_cache: bool,

    /// Delete the cached snapshot before doing anything else.
    #[clap(long)]
    pub clear_cache: bool,

    /// Print the snapshot as JSON instead of a table.
    #[clap(long)]
    pub json: bool,

    /// TOML configuration file shared with the service.
    #[clap(long)]
    pub config: Option<String>,

    /// Override the cache directory.
    #[clap(long)]
    pub cache_dir: Option<String>,
}

//! Service configuration.
//!
//! Loaded from a TOML file; every field has a default, so an empty file (or no file at
//! all) yields a working configuration:
//!
//! ```toml
//! api_base_url = "https://api.coingecko.com/api/v3"
//! currency = "eur"
//! cache_ttl_secs = 180
//! refresh_interval_secs = 120
//! cache_dir = ".price_cache"
//! symbols = ["BTC", "ETH", "SOL", "EUR"]
//! mapping_file = "extra_coins.txt"
//!
//! [mapping]
//! SUI = "sui"
//! ```
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use price_common::net::{
    DEFAULT_API_BASE_URL, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_CURRENCY,
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use price_common::symbols::{MappingParser, normalize_symbol};
use price_common::{PriceError, Result, SymbolMapping};
use serde::Deserialize;

/// Default directory of the file-backed cache.
pub const DEFAULT_CACHE_DIR: &str = ".price_cache";

/// Runtime settings of the price service and client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Provider base URL.
    pub api_base_url: String,
    /// Quote currency code, lowercase as the provider expects it.
    pub currency: String,
    /// Snapshot validity window.
    pub cache_ttl_secs: u64,
    /// Period of the background refresh.
    pub refresh_interval_secs: u64,
    /// Whole-request timeout.
    pub request_timeout_secs: u64,
    /// Connect timeout.
    pub connect_timeout_secs: u64,
    /// Directory of the persistent cache.
    pub cache_dir: PathBuf,
    /// Symbols refreshed in the background. Empty means every mapped symbol.
    pub symbols: Vec<String>,
    /// Optional `SYMBOL=identifier` file merged over the built-in mapping.
    pub mapping_file: Option<PathBuf>,
    /// Extra mapping entries, applied after `mapping_file`.
    pub mapping: BTreeMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            symbols: Vec::new(),
            mapping_file: None,
            mapping: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PriceError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML text without validating it.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PriceError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(PriceError::Config("currency must not be empty".to_string()));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(PriceError::Config("api_base_url must not be empty".to_string()));
        }
        for (name, value) in [
            ("cache_ttl_secs", self.cache_ttl_secs),
            ("refresh_interval_secs", self.refresh_interval_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("connect_timeout_secs", self.connect_timeout_secs),
        ] {
            if value == 0 {
                return Err(PriceError::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    /// Currency code in the form the provider expects.
    pub fn currency(&self) -> String {
        self.currency.trim().to_ascii_lowercase()
    }

    /// Snapshot validity window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Background refresh period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Built-in mapping extended with `mapping_file` and then `[mapping]`.
    pub fn symbol_mapping(&self) -> Result<SymbolMapping> {
        let mut mapping = SymbolMapping::default();
        if let Some(path) = &self.mapping_file {
            let file = File::open(path).map_err(|e| {
                PriceError::Config(format!("Failed to open mapping file {}: {}", path.display(), e))
            })?;
            mapping = mapping.with_entries(SymbolMapping::parse_from_file(BufReader::new(file))?);
        }
        Ok(mapping.with_entries(
            self.mapping
                .iter()
                .map(|(symbol, id)| (normalize_symbol(symbol), id.trim().to_string())),
        ))
    }

    /// Symbols to refresh in the background.
    ///
    /// Falls back to every mapped symbol plus the fiat symbol when `symbols` is empty.
    pub fn watchlist(&self, mapping: &SymbolMapping) -> Vec<String> {
        if !self.symbols.is_empty() {
            return self.symbols.iter().map(|s| normalize_symbol(s)).collect();
        }
        let mut symbols: Vec<String> = mapping.symbols().map(str::to_string).collect();
        let fiat = self.currency().to_ascii_uppercase();
        if !symbols.contains(&fiat) {
            symbols.push(fiat);
        }
        symbols
    }
}

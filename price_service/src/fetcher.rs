//! Cache-first price fetching with stale fallback.
//!
//! `PriceFetcher::fetch_prices` always produces a snapshot, never an error:
//!
//! 1. With `use_cache`, a fresh cached snapshot covering every requested crypto symbol
//!    is returned as is. No request is made.
//! 2. Otherwise requested symbols are split into the fiat pass-through symbol and crypto
//!    symbols; crypto symbols are translated to provider identifiers and unmapped ones
//!    are dropped.
//! 3. No identifiers left: the stored snapshot (whatever its age) or an empty one.
//! 4. One batched request for all identifiers. A usable response is translated back to
//!    symbols, overwrites the cache and is returned.
//! 5. Any failure (transport, status, payload) returns the stored snapshot, whatever its
//!    age, or an empty one.
//!
//! Whatever the path, a requested fiat symbol is answered with a fixed `1.0 / 0.0` quote.
//!
//! Concurrent calls are not deduplicated. Each may hit the network; the cache keeps
//! whichever snapshot is stored last.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info, warn};
use price_common::{PriceError, PriceQuote, PriceSnapshot, Result, SymbolMapping};
use strum_macros::Display;

use crate::cache::PriceCache;
use crate::config::ServiceConfig;
use crate::source::{CoinGeckoSource, PriceSource};
use crate::store::FileStore;

/// Which path produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FetchOutcome {
    /// Served from a fresh cache entry.
    Cached,
    /// Fetched from the provider and stored.
    Fetched,
    /// Nothing could be fetched; served from the stored entry (any age) or empty.
    Fallback,
}

/// Orchestrates cache, mapping and provider.
pub struct PriceFetcher {
    cache: Arc<PriceCache>,
    source: Arc<dyn PriceSource>,
    mapping: SymbolMapping,
    currency: String,
    fiat_symbol: String,
}

impl PriceFetcher {
    /// Creates a fetcher quoting in `currency` (e.g. `eur`).
    pub fn new(
        cache: Arc<PriceCache>,
        source: Arc<dyn PriceSource>,
        mapping: SymbolMapping,
        currency: &str,
    ) -> Self {
        let currency = currency.trim().to_ascii_lowercase();
        Self {
            cache,
            source,
            mapping,
            fiat_symbol: currency.to_ascii_uppercase(),
            currency,
        }
    }

    /// Wire a file-backed cache and the CoinGecko source from `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let store = FileStore::open(&config.cache_dir)?;
        let cache = Arc::new(PriceCache::with_system_clock(store, config.cache_ttl()));
        let source = Arc::new(CoinGeckoSource::new(
            &config.api_base_url,
            config.request_timeout(),
            config.connect_timeout(),
        )?);
        Ok(Self::new(cache, source, config.symbol_mapping()?, &config.currency()))
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// The symbol mapping in use.
    pub fn mapping(&self) -> &SymbolMapping {
        &self.mapping
    }

    /// Symbol answered with a pass-through quote (the uppercase quote currency).
    pub fn fiat_symbol(&self) -> &str {
        &self.fiat_symbol
    }

    /// Every mapped symbol plus the fiat symbol.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.mapping.symbols().map(str::to_string).collect();
        if !symbols.contains(&self.fiat_symbol) {
            symbols.push(self.fiat_symbol.clone());
        }
        symbols
    }

    /// Best available prices for `symbols`. See the module docs for the resolution order.
    pub async fn fetch_prices<I, S>(&self, symbols: I, use_cache: bool) -> PriceSnapshot
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch_prices_with_outcome(symbols, use_cache).await.0
    }

    /// Prices for every mapped symbol and the fiat symbol, cache first.
    pub async fn fetch_all_prices(&self) -> PriceSnapshot {
        self.fetch_prices(self.all_symbols(), true).await
    }

    /// Like [`Self::fetch_prices`], also reporting which path produced the snapshot.
    pub async fn fetch_prices_with_outcome<I, S>(
        &self,
        symbols: I,
        use_cache: bool,
    ) -> (PriceSnapshot, FetchOutcome)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let wants_fiat = requested.contains(&self.fiat_symbol);
        let crypto: Vec<&str> = requested
            .iter()
            .map(String::as_str)
            .filter(|s| *s != self.fiat_symbol)
            .collect();

        if use_cache {
            if let Some(cached) = self.cache.read() {
                if cached.contains_all(&crypto) {
                    debug!("Price cache hit for {:?}", crypto);
                    return (self.with_fiat(cached, wants_fiat), FetchOutcome::Cached);
                }
                debug!("Price cache is fresh but misses some of {:?}", crypto);
            }
        }

        let ids = self.external_ids(&crypto);
        if ids.is_empty() {
            debug!("No provider identifiers for {:?}, skipping request", crypto);
            return (self.fallback(wants_fiat), FetchOutcome::Fallback);
        }

        match self.request(&ids).await {
            Ok(snapshot) => {
                self.cache.store(&snapshot);
                info!("Fetched {} of {} requested quotes", snapshot.len(), ids.len());
                (self.with_fiat(snapshot, wants_fiat), FetchOutcome::Fetched)
            }
            Err(e) => {
                warn!("Price fetch failed, serving cached prices: {}", e);
                (self.fallback(wants_fiat), FetchOutcome::Fallback)
            }
        }
    }

    /// Delete the cached snapshot.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Provider identifiers for `symbols`, deduplicated, in request order.
    fn external_ids(&self, symbols: &[&str]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.mapping.external_id(symbol) {
                Some(id) if !ids.iter().any(|known| known == id) => ids.push(id.to_string()),
                Some(_) => {}
                None => debug!("No provider identifier for '{}', dropping it", symbol),
            }
        }
        ids
    }

    async fn request(&self, ids: &[String]) -> Result<PriceSnapshot> {
        let quotes = self.source.fetch_quotes(ids, &self.currency).await?;
        self.translate(quotes)
    }

    fn translate(&self, quotes: HashMap<String, PriceQuote>) -> Result<PriceSnapshot> {
        let mut snapshot = PriceSnapshot::new();
        for (id, quote) in quotes {
            match self.mapping.symbol_for(&id) {
                Some(symbol) => snapshot.insert(symbol, quote),
                None => debug!("Provider returned unrequested identifier '{}'", id),
            }
        }
        if snapshot.is_empty() {
            return Err(PriceError::MalformedPayload(
                "response contained no usable quotes".to_string(),
            ));
        }
        Ok(snapshot)
    }

    fn fallback(&self, wants_fiat: bool) -> PriceSnapshot {
        self.with_fiat(self.cache.read_stale().unwrap_or_default(), wants_fiat)
    }

    fn with_fiat(&self, mut snapshot: PriceSnapshot, wants_fiat: bool) -> PriceSnapshot {
        if wants_fiat {
            snapshot.insert(self.fiat_symbol.clone(), PriceQuote::pass_through());
        }
        snapshot
    }
}

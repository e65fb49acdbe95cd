//! Price quote and snapshot model.
//!
//! A `PriceSnapshot` maps an internal symbol (e.g. `BTC`) to its latest `PriceQuote`.
//! Snapshots are what the fetcher returns and what the cache persists, encoded as a
//! JSON object keyed by symbol.
use std::collections::HashMap;
use std::collections::hash_map;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Market price of one symbol in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Last price.
    pub price: f64,
    /// Percentage change over the last 24 hours.
    #[serde(rename = "change24h")]
    pub change_24h: f64,
}

impl PriceQuote {
    /// Creates a quote from a price and a 24h change.
    pub fn new(price: f64, change_24h: f64) -> Self {
        Self { price, change_24h }
    }

    /// Quote of the quote currency against itself.
    pub fn pass_through() -> Self {
        Self::new(1.0, 0.0)
    }
}

/// Prices for a set of symbols, keyed by internal symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot {
    quotes: HashMap<String, PriceQuote>,
}

impl PriceSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the quote for `symbol`.
    pub fn insert(&mut self, symbol: impl Into<String>, quote: PriceQuote) {
        self.quotes.insert(symbol.into(), quote);
    }

    /// Returns the quote for `symbol`, if present.
    pub fn get(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(symbol)
    }

    /// Returns `true` if the snapshot holds a quote for `symbol`.
    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    /// Returns `true` if every symbol yielded by `symbols` has a quote.
    pub fn contains_all<I, S>(&self, symbols: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        symbols.into_iter().all(|s| self.contains(s.as_ref()))
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Returns `true` if the snapshot holds no quotes.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Iterates over `(symbol, quote)` pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, PriceQuote> {
        self.quotes.iter()
    }

    /// Symbols sorted alphabetically, handy for stable output.
    pub fn sorted_symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.quotes.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    /// Encode the snapshot to JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a snapshot from JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl FromIterator<(String, PriceQuote)> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, PriceQuote)>>(iter: T) -> Self {
        Self {
            quotes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PriceSnapshot {
    type Item = (String, PriceQuote);
    type IntoIter = hash_map::IntoIter<String, PriceQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.into_iter()
    }
}

impl<'a> IntoIterator for &'a PriceSnapshot {
    type Item = (&'a String, &'a PriceQuote);
    type IntoIter = hash_map::Iter<'a, String, PriceQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}

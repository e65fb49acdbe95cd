//! Coin symbols and the mapping between internal symbols and provider identifiers.
//!
//! Internally every asset is addressed by its ticker-like symbol (`BTC`, `SOL`...).
//! The price provider uses its own identifiers (`bitcoin`, `solana`...), so every
//! request is translated forward through a `SymbolMapping` and every response is
//! translated back through its reverse index.
//!
//! The mapping is expected to be one-to-one. When two symbols share an identifier
//! the first registered symbol owns the reverse lookup and a warning is logged.
use std::collections::HashMap;
use std::io::BufRead;

use log::warn;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::PriceError;

/// Coins known out of the box, in registration order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Display, EnumString, EnumIter, Hash, Eq, PartialEq)]
#[strum(ascii_case_insensitive)]
pub enum Coin {
    SOL,
    BTC,
    ETH,
    BNB,
    XRP,
    ADA,
    DOGE,
    MATIC,
    DOT,
    AVAX,
    USDC,
    USDT,
}

impl Coin {
    /// CoinGecko identifier of the coin.
    pub fn external_id(&self) -> &'static str {
        match self {
            Coin::SOL => "solana",
            Coin::BTC => "bitcoin",
            Coin::ETH => "ethereum",
            Coin::BNB => "binancecoin",
            Coin::XRP => "ripple",
            Coin::ADA => "cardano",
            Coin::DOGE => "dogecoin",
            Coin::MATIC => "matic-network",
            Coin::DOT => "polkadot",
            Coin::AVAX => "avalanche-2",
            Coin::USDC => "usd-coin",
            Coin::USDT => "tether",
        }
    }
}

/// Immutable symbol ⇄ provider identifier table.
#[derive(Debug, Clone)]
pub struct SymbolMapping {
    /// `(symbol, identifier)` pairs in registration order.
    entries: Vec<(String, String)>,
    /// Symbol -> index into `entries`.
    forward: HashMap<String, usize>,
    /// Identifier -> index into `entries` of the first symbol registered for it.
    reverse: HashMap<String, usize>,
}

impl SymbolMapping {
    /// Build a mapping from `(symbol, identifier)` pairs.
    ///
    /// A symbol seen twice keeps its original position and takes the later identifier.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        Self::empty().with_entries(pairs)
    }

    fn empty() -> Self {
        Self {
            entries: Vec::new(),
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Returns a new mapping with `pairs` added on top of the current entries.
    pub fn with_entries<I, S, T>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        for (symbol, id) in pairs {
            let (symbol, id) = (symbol.into(), id.into());
            if let Some(idx) = self.forward.get(&symbol).copied() {
                self.entries[idx].1 = id;
            } else {
                self.forward.insert(symbol.clone(), self.entries.len());
                self.entries.push((symbol, id));
            }
        }
        self.rebuild_reverse();
        self
    }

    fn rebuild_reverse(&mut self) {
        self.reverse.clear();
        for (idx, (symbol, id)) in self.entries.iter().enumerate() {
            if let Some(&owner) = self.reverse.get(id) {
                warn!(
                    "Identifier '{}' is mapped by both {} and {}; responses resolve to {}",
                    id, self.entries[owner].0, symbol, self.entries[owner].0
                );
                continue;
            }
            self.reverse.insert(id.clone(), idx);
        }
    }

    /// Provider identifier for `symbol`, if mapped.
    pub fn external_id(&self, symbol: &str) -> Option<&str> {
        self.forward
            .get(symbol)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    /// Internal symbol for a provider identifier, if any symbol maps to it.
    pub fn symbol_for(&self, id: &str) -> Option<&str> {
        self.reverse
            .get(id)
            .map(|&idx| self.entries[idx].0.as_str())
    }

    /// All mapped symbols in registration order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(symbol, _)| symbol.as_str())
    }

    /// Number of mapped symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SymbolMapping {
    fn default() -> Self {
        Self::from_pairs(Coin::iter().map(|coin| (coin.to_string(), coin.external_id())))
    }
}

/// Trait providing file parsing for mapping tables.
pub trait MappingParser {
    /// Parses `SYMBOL=identifier` lines from a buffered reader.
    ///
    /// Blank lines and lines starting with `#` are skipped. Returns an error on the first
    /// line without `=` or with an empty side.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, PriceError>;
}

impl MappingParser for SymbolMapping {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, PriceError> {
        let mut pairs = Vec::new();

        for (line_no, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(PriceError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }

            match trimmed_line.split_once('=') {
                Some((symbol, id)) if !symbol.trim().is_empty() && !id.trim().is_empty() => {
                    pairs.push((symbol.trim().to_ascii_uppercase(), id.trim().to_string()));
                }
                _ => {
                    return Err(PriceError::ParseSymbolsFile(format!(
                        "line {}: expected SYMBOL=identifier, got '{}'",
                        line_no + 1,
                        trimmed_line
                    )));
                }
            }
        }
        Ok(pairs)
    }
}

/// Parses a list of symbols separated by commas, whitespace or new lines.
///
/// Symbols are uppercased; duplicates are kept in first-seen order only once.
pub fn parse_symbol_list<R: BufRead>(reader: R) -> Result<Vec<String>, PriceError> {
    let mut symbols: Vec<String> = Vec::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(PriceError::Io)?;
        for raw in line.split(|c: char| c == ',' || c.is_whitespace()) {
            let symbol = normalize_symbol(raw);
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }
    Ok(symbols)
}

/// Trim and uppercase a user-provided symbol.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().trim_matches('"').to_ascii_uppercase()
}

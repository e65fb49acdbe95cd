//! Network side of the price feed.
//!
//! A `PriceSource` answers one batched request for many provider identifiers. The
//! production source is `CoinGeckoSource`, which calls the `simple/price` endpoint:
//!
//! ```text
//! GET {base}/simple/price?ids=bitcoin,solana&vs_currencies=eur&include_24hr_change=true
//!
//! {"bitcoin": {"eur": 43250.0, "eur_24h_change": 2.34}, "solana": {...}}
//! ```
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use price_common::net::{SIMPLE_PRICE_PATH, endpoint};
use price_common::{PriceError, PriceQuote, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Provider of current quotes keyed by provider identifier.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch quotes for all `ids` in `currency` with a single round trip.
    async fn fetch_quotes(&self, ids: &[String], currency: &str) -> Result<HashMap<String, PriceQuote>>;
}

/// HTTP client for the CoinGecko public API.
#[derive(Debug, Clone)]
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    /// Builds a client for `base_url` with the given timeouts.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| PriceError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    async fn fetch_quotes(&self, ids: &[String], currency: &str) -> Result<HashMap<String, PriceQuote>> {
        let url = endpoint(&self.base_url, SIMPLE_PRICE_PATH);
        let ids_param = ids.join(",");
        debug!("GET {} ids={} vs_currencies={}", url, ids_param, currency);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids_param.as_str()),
                ("vs_currencies", currency),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .map_err(|e| PriceError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PriceError::HttpStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PriceError::Transport(e.to_string()))?;
        parse_simple_price(&body, currency)
    }
}

/// Parse a `simple/price` body into quotes keyed by provider identifier.
///
/// The body must be a JSON object. Entries lacking a numeric `<currency>` price or
/// `<currency>_24h_change` are skipped, so a partially usable body still yields the
/// usable quotes.
pub fn parse_simple_price(body: &str, currency: &str) -> Result<HashMap<String, PriceQuote>> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| PriceError::MalformedPayload(e.to_string()))?;
    let Value::Object(entries) = value else {
        return Err(PriceError::MalformedPayload(
            "expected a JSON object keyed by identifier".to_string(),
        ));
    };

    let change_key = format!("{}_24h_change", currency);
    let mut quotes = HashMap::with_capacity(entries.len());
    for (id, data) in entries {
        let price = data.get(currency).and_then(Value::as_f64);
        let change = data.get(&change_key).and_then(Value::as_f64);
        match (price, change) {
            (Some(price), Some(change)) => {
                quotes.insert(id, PriceQuote::new(price, change));
            }
            _ => debug!("Skipping incomplete quote for '{}': {}", id, data),
        }
    }
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_entries() {
        let body = r#"{
            "bitcoin": {"eur": 43250.0, "eur_24h_change": 2.34},
            "solana": {"eur": 98.12, "eur_24h_change": -4.5}
        }"#;
        let quotes = parse_simple_price(body, "eur").unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["bitcoin"], PriceQuote::new(43250.0, 2.34));
        assert_eq!(quotes["solana"], PriceQuote::new(98.12, -4.5));
    }

    #[test]
    fn skips_incomplete_entries() {
        let body = r#"{
            "bitcoin": {"eur": 43250, "eur_24h_change": 2.34},
            "tether": {"eur": 0.92, "eur_24h_change": null},
            "ripple": {"usd": 0.61, "usd_24h_change": 1.0},
            "cardano": "oops"
        }"#;
        let quotes = parse_simple_price(body, "eur").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["bitcoin"].price, 43250.0);
    }

    #[test]
    fn uses_requested_currency_keys() {
        let body = r#"{"ethereum": {"usd": 2500.0, "usd_24h_change": 0.5, "eur": 2300.0}}"#;
        let quotes = parse_simple_price(body, "usd").unwrap();
        assert_eq!(quotes["ethereum"], PriceQuote::new(2500.0, 0.5));
    }

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            parse_simple_price("[1, 2]", "eur"),
            Err(PriceError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_simple_price("<html>rate limited</html>", "eur"),
            Err(PriceError::MalformedPayload(_))
        ));
    }
}

//! Provider endpoint, storage keys and timing defaults shared by service and client.

/// Base URL of the CoinGecko public API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.coingecko.com/api/v3";
/// Path of the batched price endpoint, relative to the base URL.
pub const SIMPLE_PRICE_PATH: &str = "simple/price";
/// Quote currency requested from the provider. Its uppercase form is the fiat pass-through symbol.
pub const DEFAULT_CURRENCY: &str = "eur";

/// How long a stored snapshot counts as fresh.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 180;
/// Period of the background refresh.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 120;
/// Whole-request timeout for the provider call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Connect timeout for the provider call.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Storage key of the serialized snapshot.
pub const CACHE_KEY: &str = "cached_prices";
/// Storage key of the snapshot timestamp (Unix seconds, as text).
pub const CACHE_TIMESTAMP_KEY: &str = "cached_prices_timestamp";

/// Build the full URL of an endpoint like "base/path", tolerating a trailing slash on `base`.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

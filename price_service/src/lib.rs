//! Price fetching and caching.
//!
//! The service wires together a few small building blocks:
//!
//! - `store` — byte-oriented key-value storage (`FileStore`, `MemoryStore`).
//! - `clock` — wall clock used for cache timestamps (`SystemClock`, `ManualClock`).
//! - `cache` — `PriceCache`, the single-slot snapshot cache with a TTL.
//! - `source` — `PriceSource` and the CoinGecko HTTP client.
//! - `fetcher` — `PriceFetcher`, cache-first fetching with stale fallback.
//! - `refresher` — periodic and on-demand refresh on a background thread.
//! - `config` — TOML configuration shared by the daemon and the client.
//!
//! Construct one `PriceCache` and one `PriceFetcher` at startup and share them with
//! `Arc`; nothing in this crate is a global.
#![warn(missing_docs)]
pub mod cache;
pub mod clock;
pub mod config;
pub mod fetcher;
pub mod refresher;
pub mod source;
pub mod store;

pub use cache::PriceCache;
pub use config::ServiceConfig;
pub use fetcher::{FetchOutcome, PriceFetcher};
pub use refresher::{PriceRefresher, PriceUpdate, RefreshHandle, Trigger};
pub use source::{CoinGeckoSource, PriceSource};

//! Single-slot, time-boxed cache for the last fetched price snapshot.
//!
//! The cache persists exactly one entry: the snapshot of the last successful fetch and
//! the time it was stored. Both live in a `KeyValueStore` under fixed keys:
//!
//! - `cached_prices` — the snapshot as JSON.
//! - `cached_prices_timestamp` — the store time as floating Unix seconds.
//!
//! An entry is fresh while `now - stored_at < ttl`. Expiry is logical: an expired
//! entry stays on disk and is still served by `read_stale` until the next `store`
//! overwrites it or `clear` removes it. There is no per-symbol expiry.
//!
//! Design notes:
//! - Both keys are written and read under one `Mutex`, so a reader never pairs a new
//!   snapshot with an old timestamp.
//! - Storage and decoding failures never reach the caller. A failed `store` is logged and
//!   dropped; an unreadable entry reads as "no cache".
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use price_common::net::{CACHE_KEY, CACHE_TIMESTAMP_KEY};
use price_common::{PriceError, PriceSnapshot, Result};

use crate::clock::{Clock, SystemClock};
use crate::store::KeyValueStore;

/// The persisted cache slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Snapshot of the last successful fetch.
    pub snapshot: PriceSnapshot,
    /// Store time, Unix seconds.
    pub stored_at: f64,
}

impl CacheEntry {
    /// Returns `true` if the entry is younger than `ttl` at time `now`.
    pub fn is_fresh_at(&self, now: f64, ttl: Duration) -> bool {
        now - self.stored_at < ttl.as_secs_f64()
    }
}

/// Persistent price cache with a single time-to-live for the whole snapshot.
pub struct PriceCache {
    store: Mutex<Box<dyn KeyValueStore>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl PriceCache {
    /// Creates a cache over `store` using `clock` for timestamps.
    pub fn new(store: impl KeyValueStore + 'static, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
            clock,
            ttl,
        }
    }

    /// Creates a cache over `store` driven by the system clock.
    pub fn with_system_clock(store: impl KeyValueStore + 'static, ttl: Duration) -> Self {
        Self::new(store, Arc::new(SystemClock), ttl)
    }

    /// Validity window of a stored snapshot.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Overwrite the slot with `snapshot`, stamped with the current time.
    pub fn store(&self, snapshot: &PriceSnapshot) {
        if let Err(e) = self.try_store(snapshot) {
            warn!("Failed to persist price snapshot: {}", e);
        }
    }

    fn try_store(&self, snapshot: &PriceSnapshot) -> Result<()> {
        let encoded = snapshot.to_json_bytes()?;
        let now = self.clock.now();
        let mut store = self.store.lock()?;
        store.set(CACHE_KEY, &encoded)?;
        store.set(CACHE_TIMESTAMP_KEY, now.to_string().as_bytes())?;
        debug!("Cached {} quotes at {}", snapshot.len(), now);
        Ok(())
    }

    /// Snapshot stored less than `ttl` ago, if any.
    pub fn read(&self) -> Option<PriceSnapshot> {
        let now = self.clock.now();
        self.load_entry()
            .filter(|entry| entry.is_fresh_at(now, self.ttl))
            .map(|entry| entry.snapshot)
    }

    /// Stored snapshot regardless of its age.
    pub fn read_stale(&self) -> Option<PriceSnapshot> {
        self.load_entry().map(|entry| entry.snapshot)
    }

    /// Stored entry regardless of its age.
    pub fn entry(&self) -> Option<CacheEntry> {
        self.load_entry()
    }

    /// Seconds since the stored snapshot was written.
    pub fn age(&self) -> Option<f64> {
        let stored_at = self.stored_at().ok().flatten()?;
        Some(self.clock.now() - stored_at)
    }

    /// Returns `true` if an entry exists and is within the TTL.
    pub fn is_valid(&self) -> bool {
        let now = self.clock.now();
        match self.stored_at() {
            Ok(Some(stored_at)) => now - stored_at < self.ttl.as_secs_f64(),
            Ok(None) => false,
            Err(e) => {
                warn!("Price cache timestamp unreadable: {}", e);
                false
            }
        }
    }

    /// Delete the stored snapshot and timestamp.
    pub fn clear(&self) {
        let cleared = self.store.lock().map_err(PriceError::from).and_then(|mut store| {
            store.remove(CACHE_KEY)?;
            store.remove(CACHE_TIMESTAMP_KEY)
        });
        match cleared {
            Ok(()) => debug!("Price cache cleared"),
            Err(e) => warn!("Failed to clear price cache: {}", e),
        }
    }

    fn load_entry(&self) -> Option<CacheEntry> {
        match self.try_load_entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable price cache: {}", e);
                None
            }
        }
    }

    fn try_load_entry(&self) -> Result<Option<CacheEntry>> {
        let (data, timestamp) = {
            let store = self.store.lock()?;
            (store.get(CACHE_KEY)?, store.get(CACHE_TIMESTAMP_KEY)?)
        };
        let (Some(data), Some(timestamp)) = (data, timestamp) else {
            return Ok(None);
        };
        Ok(Some(CacheEntry {
            snapshot: PriceSnapshot::from_json_bytes(&data)?,
            stored_at: parse_timestamp(&timestamp)?,
        }))
    }

    /// Timestamp of a stored entry; a timestamp without a snapshot counts as absent.
    fn stored_at(&self) -> Result<Option<f64>> {
        let store = self.store.lock()?;
        if store.get(CACHE_KEY)?.is_none() {
            return Ok(None);
        }
        store
            .get(CACHE_TIMESTAMP_KEY)?
            .map(|raw| parse_timestamp(&raw))
            .transpose()
    }
}

fn parse_timestamp(raw: &[u8]) -> Result<f64> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| PriceError::Format(format!("cache timestamp is not UTF-8: {}", e)))?;
    match text.trim().parse::<f64>() {
        Ok(ts) if ts.is_finite() => Ok(ts),
        _ => Err(PriceError::Format(format!("invalid cache timestamp '{}'", text.trim()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use price_common::PriceQuote;

    const TTL: Duration = Duration::from_secs(180);

    fn btc_snapshot() -> PriceSnapshot {
        let mut snapshot = PriceSnapshot::new();
        snapshot.insert("BTC", PriceQuote::new(43250.0, 2.34));
        snapshot
    }

    fn cache_at(start: f64) -> (PriceCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (PriceCache::new(MemoryStore::new(), clock.clone(), TTL), clock)
    }

    #[test]
    fn empty_cache_reads_none() {
        let (cache, _) = cache_at(0.0);
        assert_eq!(cache.read(), None);
        assert_eq!(cache.read_stale(), None);
        assert_eq!(cache.age(), None);
        assert!(!cache.is_valid());
    }

    #[test]
    fn read_follows_ttl_window() {
        let (cache, clock) = cache_at(0.0);
        cache.store(&btc_snapshot());

        clock.set(100.0);
        assert_eq!(cache.read(), Some(btc_snapshot()));
        assert!(cache.is_valid());

        clock.set(179.999);
        assert!(cache.read().is_some());

        clock.set(180.0);
        assert_eq!(cache.read(), None);
        assert!(!cache.is_valid());

        clock.set(200.0);
        assert_eq!(cache.read(), None);
        assert_eq!(cache.read_stale(), Some(btc_snapshot()));
        assert_eq!(cache.age(), Some(200.0));
    }

    #[test]
    fn store_twice_is_idempotent() {
        let (cache, clock) = cache_at(1_700_000_000.25);
        cache.store(&btc_snapshot());
        assert_eq!(cache.read(), Some(btc_snapshot()));
        cache.store(&btc_snapshot());
        assert_eq!(cache.read(), Some(btc_snapshot()));
        assert_eq!(cache.entry().map(|e| e.stored_at), Some(clock.now()));
    }

    #[test]
    fn store_overwrites_instead_of_merging() {
        let (cache, clock) = cache_at(0.0);
        cache.store(&btc_snapshot());
        clock.advance(10.0);

        let mut eth = PriceSnapshot::new();
        eth.insert("ETH", PriceQuote::new(2280.5, -1.2));
        cache.store(&eth);

        assert_eq!(cache.read(), Some(eth));
        assert_eq!(cache.age(), Some(0.0));
    }

    #[test]
    fn clear_removes_entry() {
        let (cache, _) = cache_at(0.0);
        cache.store(&btc_snapshot());
        cache.clear();
        assert_eq!(cache.read_stale(), None);
        assert!(!cache.is_valid());
    }

    #[test]
    fn corrupted_snapshot_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set(CACHE_KEY, b"{not json").unwrap();
        store.set(CACHE_TIMESTAMP_KEY, b"0").unwrap();
        let cache = PriceCache::new(store, Arc::new(ManualClock::new(1.0)), TTL);

        assert_eq!(cache.read(), None);
        assert_eq!(cache.read_stale(), None);
    }

    #[test]
    fn corrupted_timestamp_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set(CACHE_KEY, &btc_snapshot().to_json_bytes().unwrap()).unwrap();
        store.set(CACHE_TIMESTAMP_KEY, b"yesterday").unwrap();
        let cache = PriceCache::new(store, Arc::new(ManualClock::new(1.0)), TTL);

        assert_eq!(cache.read(), None);
        assert!(!cache.is_valid());
    }
}

//! Background price refresh.
//!
//! `PriceRefresher::start` spawns one worker thread that owns the refresh schedule:
//!
//! - fetches once right away (`Trigger::Startup`),
//! - then on every tick of `interval` (`Trigger::Timer`),
//! - and whenever `RefreshHandle::refresh_now` is called (`Trigger::Manual`).
//!
//! Startup and timer runs go through the cache, so they only reach the provider once
//! the cached snapshot expires. Manual runs bypass it.
//!
//! Every run publishes a `PriceUpdate` on the returned channel; the worker is the only
//! publisher, so consumers see updates one at a time and in completion order. Fetches
//! run on the given tokio runtime via `Handle::block_on`; the worker thread itself never
//! lives inside the runtime.
//!
//! The worker stops on `RefreshHandle::shutdown`, when the handle is dropped, or when the
//! update receiver is dropped.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};
use log::{debug, error, info};
use price_common::{PriceError, PriceSnapshot, Result};
use strum_macros::Display;
use tokio::runtime::Handle;

use crate::fetcher::{FetchOutcome, PriceFetcher};

/// What caused a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Trigger {
    /// First run after start.
    Startup,
    /// Periodic tick.
    Timer,
    /// Explicit `refresh_now`.
    Manual,
}

impl Trigger {
    fn uses_cache(self) -> bool {
        self != Trigger::Manual
    }
}

/// Result of one refresh run.
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    /// Why the run happened.
    pub trigger: Trigger,
    /// Which path produced the snapshot.
    pub outcome: FetchOutcome,
    /// Prices for the watched symbols.
    pub snapshot: PriceSnapshot,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}

/// Control side of a running refresher.
pub struct RefreshHandle {
    refresh_tx: Sender<()>,
    shutdown_tx: Sender<()>,
    refreshing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Queue a cache-bypassing refresh.
    pub fn refresh_now(&self) -> Result<()> {
        self.refresh_tx
            .send(())
            .map_err(|e| PriceError::ChannelSend(format!("refresh request: {}", e)))
    }

    /// Returns `true` while a fetch is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Stop the worker and wait for it to exit. An in-flight fetch completes first.
    pub fn shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| PriceError::Format("price refresh worker panicked".to_string()))?;
        }
        Ok(())
    }
}

/// Periodic and on-demand price refresh.
pub struct PriceRefresher;

impl PriceRefresher {
    /// Spawn the refresh worker for `symbols`.
    pub fn start(
        fetcher: Arc<PriceFetcher>,
        symbols: Vec<String>,
        interval: Duration,
        runtime: Handle,
    ) -> (RefreshHandle, Receiver<PriceUpdate>) {
        let (refresh_tx, refresh_rx) = unbounded::<()>();
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();
        let (update_tx, update_rx) = unbounded::<PriceUpdate>();
        let refreshing = Arc::new(AtomicBool::new(false));

        let worker = {
            let refreshing = Arc::clone(&refreshing);
            thread::spawn(move || {
                let job = RefreshJob {
                    fetcher,
                    symbols,
                    runtime,
                    refreshing,
                    update_tx,
                };
                job.run_loop(interval, refresh_rx, shutdown_rx);
            })
        };

        info!("Price refresher started, interval {:?}", interval);
        (
            RefreshHandle {
                refresh_tx,
                shutdown_tx,
                refreshing,
                worker: Some(worker),
            },
            update_rx,
        )
    }
}

struct RefreshJob {
    fetcher: Arc<PriceFetcher>,
    symbols: Vec<String>,
    runtime: Handle,
    refreshing: Arc<AtomicBool>,
    update_tx: Sender<PriceUpdate>,
}

impl RefreshJob {
    fn run_loop(&self, interval: Duration, refresh_rx: Receiver<()>, shutdown_rx: Receiver<()>) {
        let ticker = tick(interval);
        if let Err(e) = self.refresh(Trigger::Startup) {
            error!("Price refresher stopping: {}", e);
            return;
        }

        loop {
            let trigger = select! {
                recv(shutdown_rx) -> _ => break,
                recv(ticker) -> _ => Trigger::Timer,
                recv(refresh_rx) -> msg => match msg {
                    Ok(()) => Trigger::Manual,
                    Err(_) => break,
                },
            };
            if let Err(e) = self.refresh(trigger) {
                error!("Price refresher stopping: {}", e);
                break;
            }
        }
        info!("Price refresher stopped");
    }

    fn refresh(&self, trigger: Trigger) -> Result<()> {
        debug!("Refreshing {} symbols ({})", self.symbols.len(), trigger);
        self.refreshing.store(true, Ordering::SeqCst);
        let (snapshot, outcome) = self.runtime.block_on(
            self.fetcher
                .fetch_prices_with_outcome(&self.symbols, trigger.uses_cache()),
        );
        self.refreshing.store(false, Ordering::SeqCst);

        self.update_tx
            .send(PriceUpdate {
                trigger,
                outcome,
                snapshot,
                completed_at: Utc::now(),
            })
            .map_err(|e| PriceError::ChannelSend(format!("price update: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PriceCache;
    use crate::clock::ManualClock;
    use crate::source::PriceSource;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use price_common::{PriceQuote, SymbolMapping};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_quotes(
            &self,
            ids: &[String],
            _currency: &str,
        ) -> Result<HashMap<String, PriceQuote>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ids
                .iter()
                .map(|id| (id.clone(), PriceQuote::new(n as f64, 0.0)))
                .collect())
        }
    }

    fn fetcher(source: Arc<CountingSource>) -> Arc<PriceFetcher> {
        let cache = PriceCache::new(
            MemoryStore::new(),
            Arc::new(ManualClock::new(0.0)),
            Duration::from_secs(180),
        );
        Arc::new(PriceFetcher::new(
            Arc::new(cache),
            source,
            SymbolMapping::default(),
            "eur",
        ))
    }

    #[test]
    fn publishes_startup_then_manual_updates() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let (handle, updates) = PriceRefresher::start(
            fetcher(source.clone()),
            vec!["BTC".to_string(), "EUR".to_string()],
            Duration::from_secs(3600),
            runtime.handle().clone(),
        );

        let startup = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(startup.trigger, Trigger::Startup);
        assert_eq!(startup.outcome, FetchOutcome::Fetched);
        assert_eq!(startup.snapshot.get("BTC"), Some(&PriceQuote::new(1.0, 0.0)));
        assert_eq!(startup.snapshot.get("EUR"), Some(&PriceQuote::pass_through()));

        handle.refresh_now().unwrap();
        let manual = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(manual.trigger, Trigger::Manual);
        assert_eq!(manual.outcome, FetchOutcome::Fetched);
        assert_eq!(manual.snapshot.get("BTC"), Some(&PriceQuote::new(2.0, 0.0)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        handle.shutdown().unwrap();
        assert!(updates.recv_timeout(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn timer_runs_are_served_from_fresh_cache() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let (handle, updates) = PriceRefresher::start(
            fetcher(source.clone()),
            vec!["ETH".to_string()],
            Duration::from_millis(20),
            runtime.handle().clone(),
        );

        assert_eq!(
            updates.recv_timeout(Duration::from_secs(5)).unwrap().outcome,
            FetchOutcome::Fetched
        );
        let tick = updates.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(tick.trigger, Trigger::Timer);
        assert_eq!(tick.outcome, FetchOutcome::Cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        handle.shutdown().unwrap();
    }
}

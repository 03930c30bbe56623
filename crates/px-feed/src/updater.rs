//! Fan-out of price batches into the derived caches.
//!
//! The [`DerivedCacheUpdater`] subscribes to every price change and patches
//! two independently-addressable caches in place: the instrument quote cache
//! (recomputing bid/ask from the asset-class spread rule) and the per-account
//! trading snapshots. Neither cache's origin is re-queried — existing entries
//! are rewritten, missing entries are left missing.

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use tracing::debug;

use px_account::snapshot::TradingSnapshotCache;
use px_core::price_cache::{KeyFilter, PriceBatch, PriceCache, SubscriptionId};
use px_core::time_util;
use px_core::types::{InstrumentCatalog, InstrumentQuote, InstrumentSpec};

/// Latest derived quote per instrument.
pub struct QuoteCache {
    inner: Mutex<AHashMap<String, InstrumentQuote>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self { inner: Mutex::new(AHashMap::new()) }
    }

    /// Create an entry from a mid price. Used when warming the cache, never
    /// by the per-tick patch path.
    pub fn seed(&self, spec: &InstrumentSpec, price: f64, now_ms: u64) {
        let quote = InstrumentQuote::from_mid(spec, price, now_ms);
        self.inner.lock().expect("quote cache poisoned").insert(quote.symbol.clone(), quote);
    }

    /// Patch an existing entry with a new mid price. Returns `false` when the
    /// symbol has no entry yet (cold cache) — absence is not synthesized.
    pub fn patch(&self, spec: &InstrumentSpec, price: f64, now_ms: u64) -> bool {
        let mut inner = self.inner.lock().expect("quote cache poisoned");
        match inner.get_mut(&spec.symbol) {
            Some(quote) => {
                quote.apply_price(spec, price, now_ms);
                true
            }
            None => false,
        }
    }

    /// Latest quote for one symbol.
    pub fn get(&self, symbol: &str) -> Option<InstrumentQuote> {
        self.inner.lock().expect("quote cache poisoned").get(symbol).cloned()
    }

    /// All current quotes.
    pub fn snapshot(&self) -> Vec<InstrumentQuote> {
        self.inner.lock().expect("quote cache poisoned").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("quote cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribes to the price cache and keeps the derived caches current.
pub struct DerivedCacheUpdater {
    catalog: InstrumentCatalog,
    quotes: Arc<QuoteCache>,
    snapshots: Arc<TradingSnapshotCache>,
}

impl DerivedCacheUpdater {
    pub fn new(
        catalog: InstrumentCatalog,
        quotes: Arc<QuoteCache>,
        snapshots: Arc<TradingSnapshotCache>,
    ) -> Self {
        Self { catalog, quotes, snapshots }
    }

    /// Apply one batch of changed prices to both derived caches.
    pub fn apply(&self, batch: &PriceBatch) {
        let now_ms = time_util::now_ms();
        let mut patched = 0usize;
        for (symbol, &price) in batch {
            if let Some(spec) = self.catalog.get(symbol) {
                if self.quotes.patch(spec, price, now_ms) {
                    patched += 1;
                }
            }
        }
        self.snapshots.patch_prices(batch);
        debug!("[updater] batch of {} — {patched} quotes patched", batch.len());
    }

    /// Subscribe to `cache` and spawn the patch loop. The task ends when the
    /// subscription is dropped via [`PriceCache::unsubscribe`].
    pub fn spawn(self, cache: &PriceCache) -> (SubscriptionId, tokio::task::JoinHandle<()>) {
        let (id, mut rx) = cache.subscribe(KeyFilter::All);
        let handle = tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                self.apply(&batch);
            }
            debug!("[updater] price subscription closed");
        });
        (id, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_core::types::{AccountSnapshot, Direction, OpenPosition};

    fn batch(entries: &[(&str, f64)]) -> PriceBatch {
        entries.iter().map(|&(s, p)| (s.to_string(), p)).collect()
    }

    fn updater_with(
        quotes: Arc<QuoteCache>,
        snapshots: Arc<TradingSnapshotCache>,
    ) -> DerivedCacheUpdater {
        DerivedCacheUpdater::new(InstrumentCatalog::new(), quotes, snapshots)
    }

    #[test]
    fn patches_seeded_quote() {
        let quotes = Arc::new(QuoteCache::new());
        let snapshots = Arc::new(TradingSnapshotCache::new());
        let catalog = InstrumentCatalog::new();
        quotes.seed(catalog.get("BTC-USD").unwrap(), 97_000.0, 1);

        let updater = updater_with(quotes.clone(), snapshots);
        updater.apply(&batch(&[("BTC-USD", 102_000.0)]));

        let q = quotes.get("BTC-USD").unwrap();
        assert_eq!(q.price, 102_000.0);
        assert!(q.bid < 102_000.0 && q.ask > 102_000.0);
    }

    #[test]
    fn cold_quote_entry_not_synthesized() {
        let quotes = Arc::new(QuoteCache::new());
        let snapshots = Arc::new(TradingSnapshotCache::new());

        let updater = updater_with(quotes.clone(), snapshots);
        updater.apply(&batch(&[("BTC-USD", 102_000.0)]));

        assert!(quotes.get("BTC-USD").is_none());
        assert!(quotes.is_empty());
    }

    #[test]
    fn snapshots_revalued_from_batch() {
        let quotes = Arc::new(QuoteCache::new());
        let snapshots = Arc::new(TradingSnapshotCache::new());
        snapshots.insert(
            AccountSnapshot::flat("acct-1", 10_000.0, 0.0),
            vec![OpenPosition {
                id: "pos-1".to_string(),
                symbol: "BTC-USD".to_string(),
                direction: Direction::Long,
                quantity: 0.5,
                leverage: 1.0,
                entry_price: 95_000.0,
                current_price: 95_000.0,
                unrealized_pnl: 0.0,
                isolated_margin: 47_500.0,
                stop_loss: None,
                take_profit: None,
                opened_at_ms: 0,
            }],
            batch(&[("BTC-USD", 95_000.0)]),
        );

        let updater = updater_with(quotes, snapshots.clone());
        updater.apply(&batch(&[("BTC-USD", 102_000.0)]));

        let snap = snapshots.get("acct-1").unwrap();
        assert!((snap.account.equity - 13_500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn spawned_updater_follows_price_cache() {
        let cache = PriceCache::new();
        let quotes = Arc::new(QuoteCache::new());
        let snapshots = Arc::new(TradingSnapshotCache::new());
        let catalog = InstrumentCatalog::new();
        quotes.seed(catalog.get("ETH-USD").unwrap(), 3_400.0, 1);

        let updater = updater_with(quotes.clone(), snapshots);
        let (id, handle) = updater.spawn(&cache);

        cache.set_many(&batch(&[("ETH-USD", 3_500.0)]), 2);

        // Give the patch loop a moment to drain the channel.
        for _ in 0..50 {
            if quotes.get("ETH-USD").map(|q| q.price) == Some(3_500.0) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(quotes.get("ETH-USD").unwrap().price, 3_500.0);

        cache.unsubscribe(id);
        // Channel sender dropped ⇒ the task exits.
        let _ = handle.await;
    }
}

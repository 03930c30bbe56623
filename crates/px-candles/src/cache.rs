//! Time-boxed, capacity-bounded candle cache in front of the upstream
//! provider.
//!
//! Entries are keyed by `(symbol, granularity, count)`. Liveness is governed
//! by the granularity's TTL; capacity eviction is FIFO by first insertion,
//! never LRU-by-access. Concurrent requests for the same key may race to
//! fetch — the cache write is last-writer-wins, which is acceptable because
//! bars are immutable within their cache window.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use tracing::debug;

use px_core::time_util;
use px_core::types::{CandleBar, Granularity, InstrumentCatalog};

use crate::CandleError;
use crate::provider::BarProvider;

/// Hard limit on the number of bars per request.
pub const MAX_BAR_COUNT: u32 = 1_500;

type CacheKey = (String, Granularity, u32);

struct Entry {
    bars: Vec<CandleBar>,
    fetched_at_ms: u64,
}

struct Inner {
    entries: AHashMap<CacheKey, Entry>,
    /// Keys in first-insertion order; front is next to evict.
    order: VecDeque<CacheKey>,
}

/// Caching proxy over a [`BarProvider`].
pub struct CandleProxyCache {
    catalog: InstrumentCatalog,
    provider: Arc<dyn BarProvider>,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl CandleProxyCache {
    pub fn new(catalog: InstrumentCatalog, provider: Arc<dyn BarProvider>, capacity: usize) -> Self {
        Self {
            catalog,
            provider,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner { entries: AHashMap::new(), order: VecDeque::new() }),
        }
    }

    /// Serve bars for `(symbol, granularity, count)`.
    ///
    /// Returns the bars and `true` when they came from a live cache entry,
    /// `false` when a fresh upstream fetch was made. `count` is clamped to
    /// `[1, MAX_BAR_COUNT]`.
    pub async fn get_bars(
        &self,
        symbol: &str,
        granularity: Granularity,
        count: u32,
    ) -> Result<(Vec<CandleBar>, bool), CandleError> {
        let provider_symbol = self
            .catalog
            .provider_symbol(symbol)
            .ok_or_else(|| CandleError::UnknownSymbol(symbol.to_string()))?
            .to_string();

        let count = count.clamp(1, MAX_BAR_COUNT);
        let key: CacheKey = (symbol.to_string(), granularity, count);

        if let Some(bars) = self.lookup(&key, time_util::now_ms()) {
            debug!("[candles] cache hit for {symbol}@{granularity} x{count}");
            return Ok((bars, true));
        }

        let bars = self.provider.fetch_bars(&provider_symbol, granularity, count).await?;
        self.store(key, bars.clone(), time_util::now_ms());
        Ok((bars, false))
    }

    /// Return a clone of a live (non-expired) entry.
    fn lookup(&self, key: &CacheKey, now_ms: u64) -> Option<Vec<CandleBar>> {
        let inner = self.inner.lock().expect("candle cache poisoned");
        let entry = inner.entries.get(key)?;
        let ttl = key.1.ttl_ms();
        if now_ms.saturating_sub(entry.fetched_at_ms) < ttl {
            Some(entry.bars.clone())
        } else {
            None
        }
    }

    /// Insert or refresh an entry, evicting the oldest insertion beyond
    /// capacity. Refreshing an existing key keeps its original FIFO slot.
    fn store(&self, key: CacheKey, bars: Vec<CandleBar>, now_ms: u64) {
        let mut inner = self.inner.lock().expect("candle cache poisoned");

        let is_new = !inner.entries.contains_key(&key);
        inner.entries.insert(key.clone(), Entry { bars, fetched_at_ms: now_ms });
        if is_new {
            inner.order.push_back(key);
            while inner.entries.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.entries.remove(&evicted);
                    debug!("[candles] evicted {evicted:?}");
                } else {
                    break;
                }
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("candle cache poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

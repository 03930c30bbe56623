//! Process-wide latest-value price store with selective pub/sub.
//!
//! One writer (the stream client) calls [`PriceCache::set_many`] per received
//! event; many readers either take non-reactive snapshots or subscribe with a
//! key filter. Notification is driven by diffing the incoming batch against
//! the stored values: only subscribers whose watched key-set intersects the
//! changed set are woken, and each receives just the changed entries it
//! watches. A symbol absent from a batch keeps its previous value — absence
//! is not invalidation.
//!
//! All mutation is serialized behind a single mutex; subscribers receive
//! batches over unbounded channels so the writer never blocks on a slow
//! consumer. Closed receivers are pruned on the next delivery attempt.

use ahash::{AHashMap, AHashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// The changed entries delivered to a subscriber: symbol → new price.
pub type PriceBatch = AHashMap<String, f64>;

/// What a subscriber wants to be woken for.
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// Every changed symbol.
    All,
    /// Only the listed symbols.
    Keys(AHashSet<String>),
}

impl KeyFilter {
    /// Convenience constructor for a single-symbol filter.
    pub fn one(symbol: impl Into<String>) -> Self {
        let mut set = AHashSet::new();
        set.insert(symbol.into());
        Self::Keys(set)
    }
}

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: u64,
    filter: KeyFilter,
    tx: mpsc::UnboundedSender<PriceBatch>,
}

struct Inner {
    prices: AHashMap<String, f64>,
    last_update_ms: u64,
    subscribers: Vec<Subscriber>,
    next_sub_id: u64,
}

/// Latest-value price store. Cheap to share as `Arc<PriceCache>`.
pub struct PriceCache {
    inner: Mutex<Inner>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                prices: AHashMap::new(),
                last_update_ms: 0,
                subscribers: Vec::new(),
                next_sub_id: 0,
            }),
        }
    }

    /// Store a batch of prices and notify affected subscribers.
    ///
    /// Non-finite and non-positive values are rejected at this boundary so
    /// every published tick satisfies `price > 0`. Returns the number of
    /// symbols whose stored value actually changed.
    pub fn set_many(&self, updates: &AHashMap<String, f64>, now_ms: u64) -> usize {
        let mut inner = self.inner.lock().expect("price cache poisoned");

        let mut changed = PriceBatch::new();
        let mut accepted_any = false;
        for (symbol, &price) in updates {
            if !price.is_finite() || price <= 0.0 {
                debug!("dropping invalid price {price} for {symbol}");
                continue;
            }
            accepted_any = true;
            let prev = inner.prices.get(symbol).copied();
            if prev != Some(price) {
                inner.prices.insert(symbol.clone(), price);
                changed.insert(symbol.clone(), price);
            }
        }

        if accepted_any {
            inner.last_update_ms = now_ms;
        }
        if changed.is_empty() {
            return 0;
        }

        let changed_count = changed.len();
        let mut dead: Vec<u64> = Vec::new();
        for sub in &inner.subscribers {
            let delivery: PriceBatch = match &sub.filter {
                KeyFilter::All => changed.clone(),
                KeyFilter::Keys(keys) => changed
                    .iter()
                    .filter(|(symbol, _)| keys.contains(symbol.as_str()))
                    .map(|(symbol, &price)| (symbol.clone(), price))
                    .collect(),
            };
            if delivery.is_empty() {
                continue;
            }
            if sub.tx.send(delivery).is_err() {
                dead.push(sub.id);
            }
        }
        if !dead.is_empty() {
            inner.subscribers.retain(|s| !dead.contains(&s.id));
        }

        changed_count
    }

    /// Register a subscriber. The receiver yields one [`PriceBatch`] per
    /// `set_many` call that changed at least one watched symbol.
    pub fn subscribe(&self, filter: KeyFilter) -> (SubscriptionId, mpsc::UnboundedReceiver<PriceBatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("price cache poisoned");
        let id = inner.next_sub_id;
        inner.next_sub_id += 1;
        inner.subscribers.push(Subscriber { id, filter, tx });
        (SubscriptionId(id), rx)
    }

    /// Remove a subscription. Dropping the receiver also detaches it lazily.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock().expect("price cache poisoned");
        inner.subscribers.retain(|s| s.id != id.0);
    }

    /// Non-reactive copy of the full price map.
    pub fn snapshot(&self) -> AHashMap<String, f64> {
        self.inner.lock().expect("price cache poisoned").prices.clone()
    }

    /// Latest price for one symbol.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.inner.lock().expect("price cache poisoned").prices.get(symbol).copied()
    }

    /// Timestamp of the last accepted batch — callers use this to detect
    /// staleness during stream disruption.
    pub fn last_update_ms(&self) -> u64 {
        self.inner.lock().expect("price cache poisoned").last_update_ms
    }

    /// Number of symbols currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("price cache poisoned").prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("price cache poisoned").subscribers.len()
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(&str, f64)]) -> AHashMap<String, f64> {
        entries.iter().map(|&(s, p)| (s.to_string(), p)).collect()
    }

    #[test]
    fn stores_and_snapshots() {
        let cache = PriceCache::new();
        cache.set_many(&batch(&[("BTC-USD", 97_000.0), ("EUR-USD", 1.08)]), 10);
        assert_eq!(cache.get("BTC-USD"), Some(97_000.0));
        assert_eq!(cache.snapshot().len(), 2);
        assert_eq!(cache.last_update_ms(), 10);
    }

    #[test]
    fn watcher_woken_only_for_its_symbol() {
        let cache = PriceCache::new();
        cache.set_many(&batch(&[("BTC-USD", 97_000.0), ("EUR-USD", 1.08)]), 1);

        let (_id, mut rx) = cache.subscribe(KeyFilter::one("BTC-USD"));

        // EUR-only batch must not wake the BTC watcher.
        cache.set_many(&batch(&[("EUR-USD", 1.09)]), 2);
        assert!(rx.try_recv().is_err());

        // A BTC change must.
        cache.set_many(&batch(&[("BTC-USD", 97_500.0), ("EUR-USD", 1.10)]), 3);
        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.len(), 1);
        assert_eq!(delivery.get("BTC-USD"), Some(&97_500.0));
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let cache = PriceCache::new();
        cache.set_many(&batch(&[("BTC-USD", 97_000.0)]), 1);

        let (_id, mut rx) = cache.subscribe(KeyFilter::one("BTC-USD"));
        let changed = cache.set_many(&batch(&[("BTC-USD", 97_000.0)]), 2);
        assert_eq!(changed, 0);
        assert!(rx.try_recv().is_err());
        // Timestamp still advances: the batch was received and accepted.
        assert_eq!(cache.last_update_ms(), 2);
    }

    #[test]
    fn absent_symbol_keeps_previous_value() {
        let cache = PriceCache::new();
        cache.set_many(&batch(&[("BTC-USD", 97_000.0), ("EUR-USD", 1.08)]), 1);
        cache.set_many(&batch(&[("EUR-USD", 1.09)]), 2);
        assert_eq!(cache.get("BTC-USD"), Some(97_000.0));
    }

    #[test]
    fn all_filter_sees_every_change() {
        let cache = PriceCache::new();
        let (_id, mut rx) = cache.subscribe(KeyFilter::All);
        cache.set_many(&batch(&[("BTC-USD", 97_000.0), ("EUR-USD", 1.08)]), 1);
        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.len(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let cache = PriceCache::new();
        let (id, mut rx) = cache.subscribe(KeyFilter::All);
        cache.unsubscribe(id);
        cache.set_many(&batch(&[("BTC-USD", 97_000.0)]), 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(cache.subscriber_count(), 0);
    }

    #[test]
    fn dropped_receiver_pruned_on_next_send() {
        let cache = PriceCache::new();
        let (_id, rx) = cache.subscribe(KeyFilter::All);
        drop(rx);
        assert_eq!(cache.subscriber_count(), 1);
        cache.set_many(&batch(&[("BTC-USD", 97_000.0)]), 1);
        assert_eq!(cache.subscriber_count(), 0);
    }

    #[test]
    fn invalid_prices_rejected() {
        let cache = PriceCache::new();
        cache.set_many(&batch(&[("BTC-USD", -1.0), ("ETH-USD", f64::NAN)]), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.last_update_ms(), 0);
    }
}

//! Per-account trading snapshot cache.
//!
//! Entries are built once from the account directory (cold miss) and then
//! patched in place on every price batch — the directory is never re-queried
//! on the hot path. An account with no cache entry is simply skipped by
//! `patch_prices`: absence is not synthesized.

use ahash::AHashMap;
use std::sync::Mutex;

use px_core::price_cache::PriceBatch;
use px_core::types::{AccountSnapshot, OpenPosition, TradingSnapshot};

use crate::valuation;

/// Cache of [`TradingSnapshot`]s keyed by account id.
pub struct TradingSnapshotCache {
    inner: Mutex<AHashMap<String, TradingSnapshot>>,
}

impl TradingSnapshotCache {
    pub fn new() -> Self {
        Self { inner: Mutex::new(AHashMap::new()) }
    }

    /// Build and store a snapshot from directory data plus current prices.
    pub fn insert(
        &self,
        account: AccountSnapshot,
        positions: Vec<OpenPosition>,
        prices: AHashMap<String, f64>,
    ) -> TradingSnapshot {
        let balance = account.balance;
        let positions = valuation::revalue(&positions, &prices);
        let totals = valuation::aggregate(balance, &positions);

        let mut account = account;
        valuation::apply_totals(&mut account, totals);

        let snapshot = TradingSnapshot { account, positions, prices };
        self.inner
            .lock()
            .expect("snapshot cache poisoned")
            .insert(snapshot.account.id.clone(), snapshot.clone());
        snapshot
    }

    /// Fetch a cached snapshot.
    pub fn get(&self, account_id: &str) -> Option<TradingSnapshot> {
        self.inner.lock().expect("snapshot cache poisoned").get(account_id).cloned()
    }

    /// Remove an account's entry (e.g. when the account is closed).
    pub fn remove(&self, account_id: &str) {
        self.inner.lock().expect("snapshot cache poisoned").remove(account_id);
    }

    /// Patch every cached snapshot with a batch of changed prices.
    ///
    /// For each snapshot, only symbols already present in its embedded price
    /// map are updated; positions are then revalued and the account aggregate
    /// recomputed. Snapshots untouched by the batch are left as-is.
    pub fn patch_prices(&self, batch: &PriceBatch) {
        let mut inner = self.inner.lock().expect("snapshot cache poisoned");
        for snapshot in inner.values_mut() {
            let mut touched = false;
            for (symbol, &price) in batch {
                if let Some(entry) = snapshot.prices.get_mut(symbol) {
                    if *entry != price {
                        *entry = price;
                        touched = true;
                    }
                }
            }
            if !touched {
                continue;
            }
            snapshot.positions = valuation::revalue(&snapshot.positions, &snapshot.prices);
            let totals = valuation::aggregate(snapshot.account.balance, &snapshot.positions);
            valuation::apply_totals(&mut snapshot.account, totals);
        }
    }

    /// Number of cached accounts.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("snapshot cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TradingSnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

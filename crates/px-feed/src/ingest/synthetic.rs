//! Synthetic spot-price source for deployments without live credentials.
//!
//! Produces a bounded random walk around each instrument's bootstrap price:
//! steps of up to ±0.5% per cycle, clamped to ±5% of the bootstrap anchor.
//! Rows built from this source carry the `synthetic` flag so downstream
//! consumers can tell fabricated prices from genuine market data.

use std::sync::Mutex;

use ahash::AHashMap;
use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;

use px_core::types::InstrumentCatalog;

use super::{PriceSource, SpotPrice};

/// Maximum step per cycle, as a fraction of the current price.
const STEP_RATIO: f64 = 0.005;

/// Maximum drift from the bootstrap anchor, as a fraction.
const DRIFT_RATIO: f64 = 0.05;

/// Random-walk source covering the whole catalog.
pub struct SyntheticSource {
    /// `(symbol, bootstrap_price)` anchors.
    anchors: Vec<(String, f64)>,
    /// Last emitted price per symbol.
    state: Mutex<AHashMap<String, f64>>,
}

impl SyntheticSource {
    pub fn new(catalog: &InstrumentCatalog) -> Self {
        let anchors = catalog
            .specs()
            .map(|spec| (spec.symbol.clone(), spec.bootstrap_price))
            .collect();
        Self { anchors, state: Mutex::new(AHashMap::new()) }
    }
}

#[async_trait]
impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn synthetic(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Vec<SpotPrice>> {
        let mut rng = rand::thread_rng();
        let mut state = self.state.lock().expect("synthetic state poisoned");

        let spots = self
            .anchors
            .iter()
            .map(|(symbol, anchor)| {
                let current = *state.get(symbol).unwrap_or(anchor);
                let step = current * rng.gen_range(-STEP_RATIO..=STEP_RATIO);
                let next = (current + step)
                    .clamp(anchor * (1.0 - DRIFT_RATIO), anchor * (1.0 + DRIFT_RATIO));
                state.insert(symbol.clone(), next);
                SpotPrice { symbol: symbol.clone(), price: next }
            })
            .collect();

        Ok(spots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn walk_stays_within_drift_bounds() {
        let catalog = InstrumentCatalog::new();
        let source = SyntheticSource::new(&catalog);

        for _ in 0..200 {
            let spots = source.fetch().await.unwrap();
            assert_eq!(spots.len(), catalog.len());
            for spot in &spots {
                let anchor = catalog.get(&spot.symbol).unwrap().bootstrap_price;
                assert!(spot.price > 0.0);
                assert!(spot.price >= anchor * (1.0 - DRIFT_RATIO) - 1e-9);
                assert!(spot.price <= anchor * (1.0 + DRIFT_RATIO) + 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn source_is_flagged_synthetic() {
        let source = SyntheticSource::new(&InstrumentCatalog::new());
        assert!(source.synthetic());
        assert_eq!(source.name(), "synthetic");
    }
}

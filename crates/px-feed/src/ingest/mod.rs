//! Scheduled spot-price ingestion.
//!
//! Driven externally (a scheduler hitting the trigger endpoint). Each run
//! pulls current spot values from every configured [`PriceSource`], computes
//! the synthetic bid/ask per asset class, and upserts rows into the persisted
//! [`PriceTable`] keyed by symbol. One failing source never blocks the
//! others: its error is recorded in the summary and the run continues.

pub mod rest;
pub mod synthetic;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use px_core::time_util;
use px_core::types::{InstrumentCatalog, PriceRow};

/// One spot value fetched from a source, in the internal symbol namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotPrice {
    pub symbol: String,
    pub price: f64,
}

/// A provider of current spot prices for some subset of the catalog.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Source label used in error reporting.
    fn name(&self) -> &str;

    /// `true` when this source fabricates prices (no live credentials).
    fn synthetic(&self) -> bool {
        false
    }

    /// Fetch current spot values. Implementations must bound the wait with a
    /// request timeout.
    async fn fetch(&self) -> anyhow::Result<Vec<SpotPrice>>;
}

/// The persisted price table downstream stream infrastructure reads from.
pub trait PriceTable: Send + Sync {
    /// Idempotent upsert keyed by symbol. Returns the number of rows written.
    fn upsert_many(&self, rows: &[PriceRow]) -> anyhow::Result<usize>;
}

/// Result of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestionSummary {
    pub updated: usize,
    pub symbols: Vec<String>,
    pub errors: Vec<String>,
}

/// Pulls from all configured sources and upserts into the price table.
pub struct PriceIngestionJob {
    catalog: InstrumentCatalog,
    sources: Vec<std::sync::Arc<dyn PriceSource>>,
}

impl PriceIngestionJob {
    pub fn new(catalog: InstrumentCatalog, sources: Vec<std::sync::Arc<dyn PriceSource>>) -> Self {
        Self { catalog, sources }
    }

    /// Run one ingestion cycle.
    pub async fn run(&self, table: &dyn PriceTable) -> IngestionSummary {
        let mut summary = IngestionSummary::default();

        for source in &self.sources {
            let spots = match source.fetch().await {
                Ok(spots) => spots,
                Err(e) => {
                    warn!("[ingest] source '{}' failed: {e}", source.name());
                    summary.errors.push(format!("{}: {e}", source.name()));
                    continue;
                }
            };

            let now_ms = time_util::now_ms();
            let rows: Vec<PriceRow> = spots
                .iter()
                .filter(|s| s.price.is_finite() && s.price > 0.0)
                .filter_map(|s| {
                    let spec = self.catalog.get(&s.symbol);
                    if spec.is_none() {
                        debug!("[ingest] skipping uncataloged symbol {}", s.symbol);
                    }
                    spec.map(|spec| PriceRow::from_spot(spec, s.price, now_ms, source.synthetic()))
                })
                .collect();

            match table.upsert_many(&rows) {
                Ok(written) => {
                    summary.updated += written;
                    summary.symbols.extend(rows.iter().map(|r| r.symbol.clone()));
                }
                Err(e) => {
                    warn!("[ingest] upsert for source '{}' failed: {e}", source.name());
                    summary.errors.push(format!("{}: {e}", source.name()));
                }
            }
        }

        info!(
            "[ingest] run complete — {} rows, {} error(s)",
            summary.updated,
            summary.errors.len(),
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    struct StaticSource {
        name: &'static str,
        result: Result<Vec<SpotPrice>, String>,
    }

    #[async_trait]
    impl PriceSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> anyhow::Result<Vec<SpotPrice>> {
            match &self.result {
                Ok(spots) => Ok(spots.clone()),
                Err(msg) => Err(anyhow!("{msg}")),
            }
        }
    }

    #[derive(Default)]
    struct RecordingTable {
        rows: Mutex<Vec<PriceRow>>,
    }

    impl PriceTable for RecordingTable {
        fn upsert_many(&self, rows: &[PriceRow]) -> anyhow::Result<usize> {
            self.rows.lock().unwrap().extend_from_slice(rows);
            Ok(rows.len())
        }
    }

    fn spot(symbol: &str, price: f64) -> SpotPrice {
        SpotPrice { symbol: symbol.to_string(), price }
    }

    #[tokio::test]
    async fn partial_failure_still_upserts_good_source() {
        let job = PriceIngestionJob::new(
            InstrumentCatalog::new(),
            vec![
                Arc::new(StaticSource { name: "broken", result: Err("HTTP 500".to_string()) }),
                Arc::new(StaticSource {
                    name: "good",
                    result: Ok(vec![spot("BTC-USD", 97_000.0), spot("ETH-USD", 3_400.0)]),
                }),
            ],
        );
        let table = RecordingTable::default();

        let summary = job.run(&table).await;
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("broken:"));
        assert_eq!(table.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rows_carry_class_specific_spread() {
        let job = PriceIngestionJob::new(
            InstrumentCatalog::new(),
            vec![Arc::new(StaticSource {
                name: "good",
                result: Ok(vec![spot("BTC-USD", 100_000.0), spot("EUR-USD", 1.08)]),
            })],
        );
        let table = RecordingTable::default();
        job.run(&table).await;

        let rows = table.rows.lock().unwrap();
        let btc = rows.iter().find(|r| r.symbol == "BTC-USD").unwrap();
        let eur = rows.iter().find(|r| r.symbol == "EUR-USD").unwrap();
        assert!((btc.current_bid - 99_950.0).abs() < 1e-6);
        assert!((btc.current_ask - 100_050.0).abs() < 1e-6);
        assert!((eur.current_ask - eur.current_bid - 0.0004).abs() < 1e-12);
        assert!(btc.current_bid <= btc.current_price && btc.current_price <= btc.current_ask);
    }

    #[tokio::test]
    async fn uncataloged_and_invalid_prices_skipped() {
        let job = PriceIngestionJob::new(
            InstrumentCatalog::new(),
            vec![Arc::new(StaticSource {
                name: "good",
                result: Ok(vec![spot("MYSTERY-USD", 5.0), spot("BTC-USD", -1.0)]),
            })],
        );
        let table = RecordingTable::default();

        let summary = job.run(&table).await;
        assert_eq!(summary.updated, 0);
        assert!(summary.errors.is_empty());
    }
}

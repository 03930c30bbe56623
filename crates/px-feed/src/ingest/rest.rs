//! Live REST spot-price source.
//!
//! Targets a Binance-style ticker endpoint: `GET /api/v3/ticker/price?symbol=X`
//! returns `{"symbol": "BTCUSDT", "price": "97000.50"}`. One request per
//! instrument; individual symbol failures are tolerated as long as at least
//! one succeeds, so a single delisted pair cannot poison the whole source.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use px_core::json_util::parse_f64_field;
use px_core::types::InstrumentCatalog;

use super::{PriceSource, SpotPrice};

/// Spot source backed by an upstream ticker endpoint.
pub struct RestSpotSource {
    name: String,
    http: reqwest::Client,
    base_url: String,
    /// `(internal_symbol, provider_symbol)` pairs this source covers.
    targets: Vec<(String, String)>,
}

impl RestSpotSource {
    pub fn new(
        name: impl Into<String>,
        base_url: String,
        catalog: &InstrumentCatalog,
        timeout: std::time::Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let targets = catalog
            .specs()
            .map(|spec| (spec.symbol.clone(), spec.provider_symbol.clone()))
            .collect();
        Self { name: name.into(), http, base_url, targets }
    }
}

#[async_trait]
impl PriceSource for RestSpotSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<SpotPrice>> {
        let mut spots = Vec::with_capacity(self.targets.len());
        let mut last_error: Option<String> = None;

        for (symbol, provider_symbol) in &self.targets {
            let url = format!("{}/api/v3/ticker/price?symbol={provider_symbol}", self.base_url);
            match self.fetch_one(&url).await {
                Ok(price) => spots.push(SpotPrice { symbol: symbol.clone(), price }),
                Err(e) => {
                    debug!("[{}] {symbol}: {e}", self.name);
                    last_error = Some(format!("{symbol}: {e}"));
                }
            }
        }

        if spots.is_empty() {
            if let Some(e) = last_error {
                return Err(anyhow!(e));
            }
        }
        Ok(spots)
    }
}

impl RestSpotSource {
    async fn fetch_one(&self, url: &str) -> Result<f64> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP {status}"));
        }
        let body: serde_json::Value = resp.json().await?;
        parse_f64_field(&body, "price")
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| anyhow!("missing price field"))
    }
}

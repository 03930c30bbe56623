//! Upstream bar provider.
//!
//! The REST implementation targets a Binance-style klines endpoint: each bar
//! arrives as a JSON array `[openTimeMs, "open", "high", "low", "close",
//! "volume", ...]`. Open times are converted from milliseconds to whole UTC
//! seconds and aligned to the granularity bucket at this boundary so the rest
//! of the system never sees provider-shaped data.

use async_trait::async_trait;
use tracing::debug;

use px_core::json_util::{parse_str_f64, parse_str_u64};
use px_core::types::{CandleBar, Granularity};

use crate::CandleError;

/// Source of historical OHLCV bars, keyed by the provider's own symbol
/// namespace.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch up to `count` most recent bars. One request, no retries.
    async fn fetch_bars(
        &self,
        provider_symbol: &str,
        granularity: Granularity,
        count: u32,
    ) -> Result<Vec<CandleBar>, CandleError>;
}

/// REST bar provider with a bounded request timeout.
pub struct RestBarProvider {
    http: reqwest::Client,
    base_url: String,
}

impl RestBarProvider {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http, base_url }
    }
}

#[async_trait]
impl BarProvider for RestBarProvider {
    async fn fetch_bars(
        &self,
        provider_symbol: &str,
        granularity: Granularity,
        count: u32,
    ) -> Result<Vec<CandleBar>, CandleError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            provider_symbol,
            granularity.as_str(),
            count,
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CandleError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CandleError::Upstream { status: status.as_u16() });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CandleError::Transport(e.to_string()))?;

        let bars = parse_klines(granularity, &body);
        debug!("[candles] fetched {} bars for {provider_symbol}@{granularity}", bars.len());
        Ok(bars)
    }
}

/// Map a provider klines payload into [`CandleBar`]s.
///
/// Rows that do not match the expected shape are skipped.
pub fn parse_klines(granularity: Granularity, body: &serde_json::Value) -> Vec<CandleBar> {
    let Some(rows) = body.as_array() else {
        return Vec::new();
    };

    let bucket = granularity.bucket_secs();
    rows.iter()
        .filter_map(|row| {
            let arr = row.as_array()?;
            let open_time_ms = parse_str_u64(arr.first())?;
            let time = open_time_ms / 1_000 / bucket * bucket;
            Some(CandleBar {
                time,
                open: parse_str_f64(arr.get(1))?,
                high: parse_str_f64(arr.get(2))?,
                low: parse_str_f64(arr.get(3))?,
                close: parse_str_f64(arr.get(4))?,
                volume: parse_str_f64(arr.get(5))?,
            })
        })
        .collect()
}

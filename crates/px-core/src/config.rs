//! Configuration parsing for the PX gateway.
//!
//! All components read their settings from a single JSON config file.
//! Every field is optional; `effective_*()` accessors supply the defaults so
//! a minimal deployment can run from `{}`.
//!
//! # Example config
//!
//! ```json
//! {
//!   "server": { "listen": "0.0.0.0:8080", "ingest_token": "s3cret" },
//!   "feed": { "url": "http://127.0.0.1:8090/stream/prices", "reconnect_delay_sec": 2 },
//!   "candles": { "provider_base_url": "https://api.binance.com", "capacity": 64 },
//!   "ingestion": { "spot_base_url": "https://api.binance.com", "live": true },
//!   "db_path": "px-gateway.db",
//!   "instruments": [
//!     { "symbol": "BTC-USD", "class": "crypto", "provider_symbol": "BTCUSDT",
//!       "bootstrap_price": 97000.0 }
//!   ],
//!   "accounts": [ { "id": "acct-1", "balance": 10000.0 } ]
//! }
//! ```

use serde::Deserialize;

use crate::types::{InstrumentCatalog, InstrumentSpec};

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub server: Option<ServerConfig>,
    pub feed: Option<FeedConfig>,
    pub candles: Option<CandleConfig>,
    pub ingestion: Option<IngestionConfig>,

    /// SQLite file backing the persisted price table.
    pub db_path: Option<String>,

    /// JSON file persisting the active account selection.
    pub selection_path: Option<String>,

    /// Instrument overlay applied on top of the default catalog.
    pub instruments: Option<Vec<InstrumentSpec>>,

    /// Demo accounts seeded into the account directory.
    pub accounts: Option<Vec<AccountConfig>>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `"0.0.0.0:8080"`.
    pub listen: Option<String>,

    /// Shared secret for the ingestion trigger. Empty or absent ⇒ open endpoint.
    pub ingest_token: Option<String>,
}

/// Price stream settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    /// Text-event stream endpoint.
    pub url: Option<String>,

    /// Fixed reconnect delay in seconds.
    pub reconnect_delay_sec: Option<u64>,
}

/// Candle proxy settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleConfig {
    /// Upstream bar provider base URL.
    pub provider_base_url: Option<String>,

    /// Maximum number of cached (symbol, granularity, count) entries.
    pub capacity: Option<usize>,

    /// Upstream request timeout in seconds.
    pub request_timeout_sec: Option<u64>,
}

/// Spot price ingestion settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionConfig {
    /// Spot price provider base URL.
    pub spot_base_url: Option<String>,

    /// Upstream request timeout in seconds.
    pub request_timeout_sec: Option<u64>,

    /// When `false` (default), the synthetic random-walk source is used
    /// instead of the live provider.
    pub live: Option<bool>,
}

/// One demo account entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub balance: f64,
    pub realized_pnl: Option<f64>,
}

impl AppConfig {
    pub fn effective_listen(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.listen.clone())
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
    }

    /// Ingestion trigger token; `None` when the endpoint should be open.
    pub fn effective_ingest_token(&self) -> Option<String> {
        self.server
            .as_ref()
            .and_then(|s| s.ingest_token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn effective_feed_url(&self) -> String {
        self.feed
            .as_ref()
            .and_then(|f| f.url.clone())
            .unwrap_or_else(|| "http://127.0.0.1:8090/stream/prices".to_string())
    }

    pub fn effective_reconnect_delay_sec(&self) -> u64 {
        self.feed.as_ref().and_then(|f| f.reconnect_delay_sec).unwrap_or(2)
    }

    pub fn effective_provider_base_url(&self) -> String {
        self.candles
            .as_ref()
            .and_then(|c| c.provider_base_url.clone())
            .unwrap_or_else(|| "https://api.binance.com".to_string())
    }

    pub fn effective_candle_capacity(&self) -> usize {
        self.candles.as_ref().and_then(|c| c.capacity).unwrap_or(64)
    }

    pub fn effective_candle_timeout_sec(&self) -> u64 {
        self.candles.as_ref().and_then(|c| c.request_timeout_sec).unwrap_or(5)
    }

    pub fn effective_spot_base_url(&self) -> String {
        self.ingestion
            .as_ref()
            .and_then(|i| i.spot_base_url.clone())
            .unwrap_or_else(|| "https://api.binance.com".to_string())
    }

    pub fn effective_ingest_timeout_sec(&self) -> u64 {
        self.ingestion.as_ref().and_then(|i| i.request_timeout_sec).unwrap_or(5)
    }

    pub fn live_ingestion(&self) -> bool {
        self.ingestion.as_ref().and_then(|i| i.live).unwrap_or(false)
    }

    pub fn effective_db_path(&self) -> String {
        self.db_path.clone().unwrap_or_else(|| "px-gateway.db".to_string())
    }

    pub fn effective_selection_path(&self) -> String {
        self.selection_path.clone().unwrap_or_else(|| "active_account.json".to_string())
    }

    /// Default catalog with the config's instrument overlay applied.
    pub fn build_catalog(&self) -> InstrumentCatalog {
        let mut catalog = InstrumentCatalog::new();
        if let Some(entries) = &self.instruments {
            for spec in entries {
                catalog.insert(spec.clone());
            }
        }
        catalog
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

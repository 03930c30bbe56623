//! Instrument catalog and asset-class spread rules.
//!
//! Internal symbols use the dashed pair form (`BTC-USD`); upstream providers
//! use their own concatenated namespace (`BTCUSDT`). The [`InstrumentCatalog`]
//! owns the supported-symbol set, the provider translation, and the static
//! attributes (asset class, bootstrap price) the ingestion and quote layers
//! need. Default instruments are pre-loaded; config entries overlay them.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Proportional spread applied to crypto-class instruments (5 bps).
pub const CRYPTO_SPREAD_RATIO: f64 = 0.0005;

/// Fixed absolute spread applied to currency pairs (2 pips).
pub const FX_PIP_SPREAD: f64 = 0.0002;

/// Asset class of an instrument — determines the synthetic bid/ask rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Crypto assets: proportional spread around the mid price.
    Crypto,
    /// Currency pairs: fixed absolute pip spread.
    Fx,
}

impl AssetClass {
    /// Half-width of the synthetic bid/ask gap for a given mid price.
    pub fn spread(self, price: f64) -> f64 {
        match self {
            Self::Crypto => price * CRYPTO_SPREAD_RATIO,
            Self::Fx => FX_PIP_SPREAD,
        }
    }

    /// Funding rate written to the price table for this class.
    pub fn funding_rate(self) -> f64 {
        match self {
            Self::Crypto => 0.0001,
            Self::Fx => 0.0,
        }
    }
}

/// Static attributes of one tradable instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSpec {
    /// Internal symbol (e.g. `BTC-USD`).
    pub symbol: String,
    /// Asset class — selects the spread rule.
    pub class: AssetClass,
    /// Symbol in the upstream provider's namespace (e.g. `BTCUSDT`).
    pub provider_symbol: String,
    /// Anchor price for the synthetic random walk when no live source is configured.
    pub bootstrap_price: f64,
}

/// Default instruments: `(symbol, provider_symbol, bootstrap_price)`.
const DEFAULT_CRYPTO: &[(&str, &str, f64)] = &[
    ("BTC-USD", "BTCUSDT", 97_000.0),
    ("ETH-USD", "ETHUSDT", 3_400.0),
    ("SOL-USD", "SOLUSDT", 190.0),
    ("XRP-USD", "XRPUSDT", 2.4),
];

const DEFAULT_FX: &[(&str, &str, f64)] = &[
    ("EUR-USD", "EURUSDT", 1.08),
    ("GBP-USD", "GBPUSDT", 1.27),
];

/// Registry of supported instruments keyed by internal symbol.
#[derive(Debug, Clone)]
pub struct InstrumentCatalog {
    by_symbol: AHashMap<String, InstrumentSpec>,
}

impl InstrumentCatalog {
    /// Create a catalog pre-loaded with the default instrument set.
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for &(symbol, provider, price) in DEFAULT_CRYPTO {
            catalog.insert(InstrumentSpec {
                symbol: symbol.to_string(),
                class: AssetClass::Crypto,
                provider_symbol: provider.to_string(),
                bootstrap_price: price,
            });
        }
        for &(symbol, provider, price) in DEFAULT_FX {
            catalog.insert(InstrumentSpec {
                symbol: symbol.to_string(),
                class: AssetClass::Fx,
                provider_symbol: provider.to_string(),
                bootstrap_price: price,
            });
        }
        catalog
    }

    /// Create an empty catalog with no instruments.
    pub fn empty() -> Self {
        Self { by_symbol: AHashMap::new() }
    }

    /// Add or replace an instrument.
    pub fn insert(&mut self, spec: InstrumentSpec) {
        self.by_symbol.insert(spec.symbol.clone(), spec);
    }

    /// Look up an instrument by internal symbol.
    pub fn get(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.by_symbol.get(symbol)
    }

    /// Returns `true` if the symbol is supported.
    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    /// Translate an internal symbol to the provider's namespace.
    pub fn provider_symbol(&self, symbol: &str) -> Option<&str> {
        self.by_symbol.get(symbol).map(|s| s.provider_symbol.as_str())
    }

    /// All supported internal symbols.
    pub fn symbols(&self) -> Vec<&str> {
        self.by_symbol.keys().map(|s| s.as_str()).collect()
    }

    /// Iterate over all instrument specs.
    pub fn specs(&self) -> impl Iterator<Item = &InstrumentSpec> {
        self.by_symbol.values()
    }

    /// Returns the number of instruments.
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    /// Returns `true` if no instruments are registered.
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl Default for InstrumentCatalog {
    fn default() -> Self {
        Self::new()
    }
}

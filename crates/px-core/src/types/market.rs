//! Market data structures — ticks, quotes, and persisted price rows.
//!
//! These are latest-value types: each ingestion cycle overwrites them in
//! place, no per-tick history is retained on the streaming path.

use serde::{Deserialize, Serialize};

use super::instrument::InstrumentSpec;

/// One price update for a single instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub timestamp_ms: u64,
}

/// Derived instrument quote with synthetic bid/ask spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuote {
    pub symbol: String,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
    pub mark_price: f64,
    pub last_updated_ms: u64,
}

impl InstrumentQuote {
    /// Build a quote from a mid price using the instrument's spread rule.
    pub fn from_mid(spec: &InstrumentSpec, price: f64, now_ms: u64) -> Self {
        let spread = spec.class.spread(price);
        Self {
            symbol: spec.symbol.clone(),
            price,
            bid: price - spread,
            ask: price + spread,
            mark_price: price,
            last_updated_ms: now_ms,
        }
    }

    /// Patch this quote in place with a new mid price.
    pub fn apply_price(&mut self, spec: &InstrumentSpec, price: f64, now_ms: u64) {
        let spread = spec.class.spread(price);
        self.price = price;
        self.bid = price - spread;
        self.ask = price + spread;
        self.mark_price = price;
        self.last_updated_ms = now_ms;
    }
}

/// One row of the persisted price table. Upserts are keyed by `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub symbol: String,
    pub current_price: f64,
    pub current_bid: f64,
    pub current_ask: f64,
    pub mark_price: f64,
    pub funding_rate: f64,
    pub last_updated_ms: u64,
    /// `true` when the row came from the synthetic random walk, not live data.
    pub synthetic: bool,
}

impl PriceRow {
    /// Build a table row from a spot price using the instrument's spread rule.
    pub fn from_spot(spec: &InstrumentSpec, price: f64, now_ms: u64, synthetic: bool) -> Self {
        let spread = spec.class.spread(price);
        Self {
            symbol: spec.symbol.clone(),
            current_price: price,
            current_bid: price - spread,
            current_ask: price + spread,
            mark_price: price,
            funding_rate: spec.class.funding_rate(),
            last_updated_ms: now_ms,
            synthetic,
        }
    }
}

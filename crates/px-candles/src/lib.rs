//! # px-candles
//!
//! Historical bar proxy: shields a rate-limited upstream provider behind a
//! time-boxed, capacity-bounded cache and the catalog's symbol translation.
//!
//! - [`provider`] — upstream bar provider trait + REST implementation
//! - [`cache`] — the [`cache::CandleProxyCache`] itself

pub mod cache;
pub mod provider;

pub use cache::CandleProxyCache;
pub use provider::{BarProvider, RestBarProvider};

use thiserror::Error;

/// Errors surfaced by the candle proxy.
///
/// Validation errors are never retried; an upstream failure carries the
/// provider's status and retry (if any) is the caller's responsibility.
#[derive(Debug, Error)]
pub enum CandleError {
    /// Symbol is not in the instrument catalog.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Timeframe string is not one of the supported granularities.
    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    /// Upstream responded with a non-success status.
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    /// Request never produced a response (timeout, connect failure).
    #[error("upstream transport error: {0}")]
    Transport(String),
}

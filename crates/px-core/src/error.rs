//! Typed error definitions for the PX gateway.
//!
//! Provides [`PxError`] for domain-specific errors that are more informative
//! than plain `anyhow::Error` strings. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate seamlessly with `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the PX gateway.
#[derive(Debug, Error)]
pub enum PxError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Price stream connection or decoding error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Upstream payload parsing error.
    #[error("parse error: {0}")]
    Parse(String),

    /// Price table read/write error.
    #[error("table error: {0}")]
    Table(String),
}

//! # px-core
//!
//! Core crate for the PX price gateway, providing:
//!
//! - **Types** (`types`) — instruments, ticks, quotes, positions, accounts, candles
//! - **Price cache** (`price_cache`) — latest-value store with selective pub/sub
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Error types** (`error`) — domain-specific `PxError` via thiserror
//! - **JSON helpers** (`json_util`) — string-or-number field parsing
//! - **Time utilities** (`time_util`) — epoch timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod json_util;
pub mod logging;
pub mod price_cache;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;

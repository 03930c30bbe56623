//! Epoch timestamp helpers.
//!
//! All timestamps flowing through the gateway are integer milliseconds since
//! the Unix epoch unless a field name says otherwise. Candle times are whole
//! UTC seconds, converted at the provider boundary.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    d.as_millis() as u64
}

/// Current time as **whole seconds** since Unix epoch.
#[inline]
pub fn now_secs() -> u64 {
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    d.as_secs()
}

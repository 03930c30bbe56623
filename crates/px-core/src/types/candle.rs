//! Historical bar types and granularity buckets.

use serde::{Deserialize, Serialize};

/// One OHLCV bar. `time` is whole UTC seconds, aligned to the granularity
/// bucket. Immutable once fetched within its cache window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleBar {
    pub time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bar time-bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Granularity {
    /// Parse the wire form (`1m`, `5m`, `15m`, `1h`, `4h`, `1d`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Self::M1),
            "5m" => Some(Self::M5),
            "15m" => Some(Self::M15),
            "1h" => Some(Self::H1),
            "4h" => Some(Self::H4),
            "1d" => Some(Self::D1),
            _ => None,
        }
    }

    /// Wire form, also used as the provider interval parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Bucket width in seconds.
    pub fn bucket_secs(self) -> u64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::H1 => 3_600,
            Self::H4 => 14_400,
            Self::D1 => 86_400,
        }
    }

    /// Cache time-to-live in milliseconds. Finer granularities expire sooner.
    pub fn ttl_ms(self) -> u64 {
        match self {
            Self::M1 => 10_000,
            Self::M5 => 30_000,
            Self::M15 => 60_000,
            Self::H1 => 120_000,
            Self::H4 => 300_000,
            Self::D1 => 600_000,
        }
    }

    /// All supported granularities, finest first.
    pub fn all() -> [Self; 6] {
        [Self::M1, Self::M5, Self::M15, Self::H1, Self::H4, Self::D1]
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for g in Granularity::all() {
            assert_eq!(Granularity::parse(g.as_str()), Some(g));
        }
        assert_eq!(Granularity::parse("2h"), None);
        assert_eq!(Granularity::parse(""), None);
    }

    #[test]
    fn ttl_increases_with_bucket() {
        let all = Granularity::all();
        for pair in all.windows(2) {
            assert!(pair[0].bucket_secs() < pair[1].bucket_secs());
            assert!(pair[0].ttl_ms() < pair[1].ttl_ms());
        }
    }
}

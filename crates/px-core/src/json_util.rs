//! Shared JSON parsing helpers used by the feed and candle modules.
//!
//! Upstream providers encode numeric values as either JSON strings
//! (`"30000.5"`) or native numbers (`30000.5`); these helpers accept both.

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as `u64`.
#[inline]
pub fn parse_str_u64(v: Option<&serde_json::Value>) -> Option<u64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        s.parse().ok()
    } else {
        v.as_u64()
    }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_string_and_number() {
        let v = serde_json::json!({"a": "30000.5", "b": 30000.5});
        assert_eq!(parse_f64_field(&v, "a"), Some(30000.5));
        assert_eq!(parse_f64_field(&v, "b"), Some(30000.5));
    }

    #[test]
    fn rejects_garbage() {
        let v = serde_json::json!({"a": "not-a-number", "b": true});
        assert_eq!(parse_f64_field(&v, "a"), None);
        assert_eq!(parse_f64_field(&v, "b"), None);
        assert_eq!(parse_f64_field(&v, "missing"), None);
    }

    #[test]
    fn u64_from_string() {
        let v = serde_json::json!({"t": "1672515782136"});
        assert_eq!(parse_str_u64(v.get("t")), Some(1672515782136));
    }
}

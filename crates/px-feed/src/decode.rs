//! Price event framing and decoding.
//!
//! The feed is a long-lived HTTP response body carrying discrete text events:
//! blank-line-delimited blocks whose `data:` lines hold a JSON payload of
//! shape `{"prices": {"<symbol>": <number>, ...}}`. Parsing is lenient —
//! a malformed event is dropped without disturbing the connection.

use ahash::AHashMap;

use px_core::json_util::parse_str_f64;

/// Pull complete event payloads out of a streaming buffer.
///
/// Consumes every `\n\n`-terminated block from `buf`, leaving any trailing
/// partial event in place for the next chunk. Returns the concatenated
/// `data:` payload of each block; blocks with no `data:` line are skipped.
pub fn drain_events(buf: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buf.find("\n\n") {
        let block: String = buf.drain(..pos + 2).collect();
        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }

    payloads
}

/// Decode one event payload into a symbol → price map.
///
/// Returns `None` when the payload is not valid JSON or lacks a `prices`
/// object. Entries that are not positive finite numbers are skipped.
pub fn parse_price_event(payload: &str) -> Option<AHashMap<String, f64>> {
    let v: serde_json::Value = serde_json::from_str(payload).ok()?;
    let prices = v.get("prices")?.as_object()?;

    let map: AHashMap<String, f64> = prices
        .iter()
        .filter_map(|(symbol, value)| {
            let price = parse_str_f64(Some(value))?;
            (price.is_finite() && price > 0.0).then(|| (symbol.clone(), price))
        })
        .collect();

    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_complete_events_keeps_partial() {
        let mut buf = String::from(
            "data: {\"prices\":{\"BTC-USD\":97000}}\n\ndata: {\"prices\":{\"EUR-USD\":1.08}}\n\ndata: {\"pri",
        );
        let events = drain_events(&mut buf);
        assert_eq!(events.len(), 2);
        assert_eq!(buf, "data: {\"pri");
    }

    #[test]
    fn multi_line_data_joined() {
        let mut buf = String::from("event: tick\ndata: {\"prices\":\ndata: {\"BTC-USD\":1}}\n\n");
        let events = drain_events(&mut buf);
        assert_eq!(events, vec!["{\"prices\":\n{\"BTC-USD\":1}}"]);
    }

    #[test]
    fn block_without_data_skipped() {
        let mut buf = String::from(": keep-alive\n\n");
        assert!(drain_events(&mut buf).is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn parses_price_map() {
        let map = parse_price_event(r#"{"prices":{"BTC-USD":97000.5,"EUR-USD":"1.08"}}"#).unwrap();
        assert_eq!(map.get("BTC-USD"), Some(&97000.5));
        assert_eq!(map.get("EUR-USD"), Some(&1.08));
    }

    #[test]
    fn malformed_payload_is_none() {
        assert!(parse_price_event("not json").is_none());
        assert!(parse_price_event(r#"{"ticks":{}}"#).is_none());
        assert!(parse_price_event(r#"{"prices":[1,2]}"#).is_none());
    }

    #[test]
    fn non_positive_entries_skipped() {
        let map = parse_price_event(r#"{"prices":{"A":-5,"B":0,"C":2.5}}"#).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("C"), Some(&2.5));
    }
}

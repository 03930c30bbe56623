//! Position revaluation and account aggregation.
//!
//! Pure functions of their inputs: no clocks, no hidden state, so the same
//! price map always yields the same valuations. Rounding happens at display
//! boundaries outside this crate, never here.

use ahash::AHashMap;
use px_core::types::{AccountSnapshot, OpenPosition};

/// Aggregate totals produced by [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountTotals {
    pub unrealized_pnl: f64,
    pub equity: f64,
    pub total_margin_required: f64,
    pub available_margin: f64,
}

/// Revalue positions against a price map.
///
/// Positions whose symbol is present in `prices` get `current_price` and
/// `unrealized_pnl` recomputed; the rest pass through unchanged.
pub fn revalue(positions: &[OpenPosition], prices: &AHashMap<String, f64>) -> Vec<OpenPosition> {
    positions
        .iter()
        .map(|p| match prices.get(&p.symbol) {
            Some(&price) => {
                let mut updated = p.clone();
                updated.current_price = price;
                updated.unrealized_pnl = p.pnl_at(price);
                updated.isolated_margin = p.margin();
                updated
            }
            None => p.clone(),
        })
        .collect()
}

/// Sum unrealized P&L and margin over a position set and derive equity.
///
/// `equity = balance + Σ unrealized_pnl`;
/// `available_margin = equity − total_margin_required`.
pub fn aggregate(balance: f64, positions: &[OpenPosition]) -> AccountTotals {
    let unrealized_pnl: f64 = positions.iter().map(|p| p.unrealized_pnl).sum();
    let total_margin_required: f64 = positions.iter().map(|p| p.isolated_margin).sum();
    let equity = balance + unrealized_pnl;
    AccountTotals {
        unrealized_pnl,
        equity,
        total_margin_required,
        available_margin: equity - total_margin_required,
    }
}

/// Apply [`aggregate`] totals to an account snapshot.
pub fn apply_totals(account: &mut AccountSnapshot, totals: AccountTotals) {
    account.unrealized_pnl = totals.unrealized_pnl;
    account.equity = totals.equity;
    account.total_margin_required = totals.total_margin_required;
    account.available_margin = totals.available_margin;
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_core::types::Direction;

    fn position(symbol: &str, direction: Direction, qty: f64, leverage: f64, entry: f64) -> OpenPosition {
        OpenPosition {
            id: format!("pos-{symbol}"),
            symbol: symbol.to_string(),
            direction,
            quantity: qty,
            leverage,
            entry_price: entry,
            current_price: entry,
            unrealized_pnl: 0.0,
            isolated_margin: entry * qty / leverage,
            stop_loss: None,
            take_profit: None,
            opened_at_ms: 0,
        }
    }

    fn prices(entries: &[(&str, f64)]) -> AHashMap<String, f64> {
        entries.iter().map(|&(s, p)| (s.to_string(), p)).collect()
    }

    #[test]
    fn long_pnl_at_higher_mark() {
        let positions = vec![position("BTC-USD", Direction::Long, 0.5, 1.0, 95_000.0)];
        let out = revalue(&positions, &prices(&[("BTC-USD", 102_000.0)]));
        assert!((out[0].unrealized_pnl - 3_500.0).abs() < 1e-9);
        assert_eq!(out[0].current_price, 102_000.0);
    }

    #[test]
    fn short_pnl_inverts() {
        let positions = vec![position("BTC-USD", Direction::Short, 0.5, 2.0, 95_000.0)];
        let out = revalue(&positions, &prices(&[("BTC-USD", 102_000.0)]));
        assert!((out[0].unrealized_pnl - (-7_000.0)).abs() < 1e-9);
    }

    #[test]
    fn revalue_is_idempotent() {
        let positions = vec![
            position("BTC-USD", Direction::Long, 0.5, 1.0, 95_000.0),
            position("ETH-USD", Direction::Short, 2.0, 3.0, 3_500.0),
        ];
        let map = prices(&[("BTC-USD", 102_000.0), ("ETH-USD", 3_300.0)]);
        let once = revalue(&positions, &map);
        let twice = revalue(&once, &map);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_symbol_passes_through() {
        let positions = vec![position("SOL-USD", Direction::Long, 10.0, 1.0, 190.0)];
        let out = revalue(&positions, &prices(&[("BTC-USD", 102_000.0)]));
        assert_eq!(out[0], positions[0]);
    }

    #[test]
    fn aggregate_derives_equity_and_margin() {
        let mut positions = vec![position("BTC-USD", Direction::Long, 0.5, 1.0, 95_000.0)];
        positions = revalue(&positions, &prices(&[("BTC-USD", 102_000.0)]));
        let totals = aggregate(10_000.0, &positions);
        assert!((totals.unrealized_pnl - 3_500.0).abs() < 1e-9);
        assert!((totals.equity - 13_500.0).abs() < 1e-9);
        assert!((totals.total_margin_required - 47_500.0).abs() < 1e-9);
        assert!((totals.available_margin - (13_500.0 - 47_500.0)).abs() < 1e-9);
    }

    #[test]
    fn aggregate_empty_positions() {
        let totals = aggregate(5_000.0, &[]);
        assert_eq!(totals.unrealized_pnl, 0.0);
        assert_eq!(totals.equity, 5_000.0);
        assert_eq!(totals.available_margin, 5_000.0);
    }
}

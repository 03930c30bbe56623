//! Account and position structures.
//!
//! Positions are created by an external execution collaborator; the gateway
//! only reads them and patches the numeric fields on each tick.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// An open position owned by an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub quantity: f64,
    pub leverage: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub isolated_margin: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub opened_at_ms: u64,
}

impl OpenPosition {
    /// Unrealized P&L at a given mark price.
    ///
    /// `(long ? price − entry : entry − price) × quantity × leverage`
    pub fn pnl_at(&self, price: f64) -> f64 {
        let delta = match self.direction {
            Direction::Long => price - self.entry_price,
            Direction::Short => self.entry_price - price,
        };
        delta * self.quantity * self.leverage
    }

    /// Margin locked by this position under isolated margining.
    pub fn margin(&self) -> f64 {
        self.entry_price * self.quantity / self.leverage
    }
}

/// Aggregate account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: String,
    pub balance: f64,
    pub equity: f64,
    pub available_margin: f64,
    pub total_margin_required: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
}

impl AccountSnapshot {
    /// A flat account with no open exposure.
    pub fn flat(id: impl Into<String>, balance: f64, realized_pnl: f64) -> Self {
        Self {
            id: id.into(),
            balance,
            equity: balance,
            available_margin: balance,
            total_margin_required: 0.0,
            realized_pnl,
            unrealized_pnl: 0.0,
        }
    }
}

/// Per-account derived cache entry: the account aggregate, its open
/// positions, and the price map the valuations were computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSnapshot {
    pub account: AccountSnapshot,
    pub positions: Vec<OpenPosition>,
    pub prices: AHashMap<String, f64>,
}

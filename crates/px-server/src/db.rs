//! SQLite-backed persisted price table.
//!
//! One row per symbol; writes are idempotent upserts keyed by symbol. The
//! table is the hand-off point between the ingestion job and the stream
//! infrastructure that serves the price-event endpoint.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use px_core::types::PriceRow;
use px_feed::ingest::PriceTable;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS prices (
    symbol        TEXT PRIMARY KEY,
    current_price REAL NOT NULL,
    current_bid   REAL NOT NULL,
    current_ask   REAL NOT NULL,
    mark_price    REAL NOT NULL,
    funding_rate  REAL NOT NULL,
    last_updated  INTEGER NOT NULL,
    synthetic     INTEGER NOT NULL DEFAULT 0
)";

const UPSERT: &str = "
INSERT INTO prices (symbol, current_price, current_bid, current_ask, mark_price, funding_rate, last_updated, synthetic)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
ON CONFLICT(symbol) DO UPDATE SET
    current_price = excluded.current_price,
    current_bid   = excluded.current_bid,
    current_ask   = excluded.current_ask,
    mark_price    = excluded.mark_price,
    funding_rate  = excluded.funding_rate,
    last_updated  = excluded.last_updated,
    synthetic     = excluded.synthetic";

/// Price table over a single SQLite connection.
pub struct SqlitePriceTable {
    conn: Mutex<Connection>,
}

impl SqlitePriceTable {
    /// Open (or create) the table at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("opening price db at {}", path.as_ref().display()))?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory table for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Read every row, ordered by symbol.
    pub fn load_all(&self) -> Result<Vec<PriceRow>> {
        let conn = self.conn.lock().expect("price table poisoned");
        let mut stmt = conn.prepare(
            "SELECT symbol, current_price, current_bid, current_ask, mark_price, funding_rate, last_updated, synthetic
             FROM prices ORDER BY symbol",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PriceRow {
                    symbol: row.get(0)?,
                    current_price: row.get(1)?,
                    current_bid: row.get(2)?,
                    current_ask: row.get(3)?,
                    mark_price: row.get(4)?,
                    funding_rate: row.get(5)?,
                    last_updated_ms: row.get::<_, i64>(6)? as u64,
                    synthetic: row.get::<_, i64>(7)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl PriceTable for SqlitePriceTable {
    fn upsert_many(&self, rows: &[PriceRow]) -> Result<usize> {
        let mut conn = self.conn.lock().expect("price table poisoned");
        let tx = conn.transaction()?;
        for row in rows {
            tx.execute(
                UPSERT,
                params![
                    row.symbol,
                    row.current_price,
                    row.current_bid,
                    row.current_ask,
                    row.mark_price,
                    row.funding_rate,
                    row.last_updated_ms as i64,
                    row.synthetic as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use px_core::types::{AssetClass, InstrumentSpec};

    fn row(symbol: &str, price: f64) -> PriceRow {
        let spec = InstrumentSpec {
            symbol: symbol.to_string(),
            class: AssetClass::Crypto,
            provider_symbol: symbol.replace('-', ""),
            bootstrap_price: price,
        };
        PriceRow::from_spot(&spec, price, 1_000, false)
    }

    #[test]
    fn upsert_and_reload() {
        let table = SqlitePriceTable::open_in_memory().unwrap();
        table.upsert_many(&[row("BTC-USD", 97_000.0), row("ETH-USD", 3_400.0)]).unwrap();

        let rows = table.load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "BTC-USD");
        assert!(rows[0].current_bid < rows[0].current_price);
    }

    #[test]
    fn upsert_is_idempotent_per_symbol() {
        let table = SqlitePriceTable::open_in_memory().unwrap();
        table.upsert_many(&[row("BTC-USD", 97_000.0)]).unwrap();
        table.upsert_many(&[row("BTC-USD", 98_000.0)]).unwrap();

        let rows = table.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].current_price, 98_000.0);
    }
}

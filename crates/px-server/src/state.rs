//! Shared application state handed to every route handler.

use std::sync::Arc;

use tokio::sync::watch;

use px_account::resolver::SelectionStore;
use px_account::snapshot::TradingSnapshotCache;
use px_account::AccountDirectory;
use px_candles::CandleProxyCache;
use px_core::config::AppConfig;
use px_core::price_cache::PriceCache;
use px_core::types::InstrumentCatalog;
use px_feed::ingest::PriceIngestionJob;
use px_feed::stream::ConnState;
use px_feed::updater::QuoteCache;

use crate::db::SqlitePriceTable;

pub struct AppState {
    pub config: AppConfig,
    pub catalog: InstrumentCatalog,
    pub prices: Arc<PriceCache>,
    pub quotes: Arc<QuoteCache>,
    pub snapshots: Arc<TradingSnapshotCache>,
    pub candles: CandleProxyCache,
    pub table: Arc<SqlitePriceTable>,
    pub ingest_job: PriceIngestionJob,
    pub directory: Arc<dyn AccountDirectory>,
    pub selection: Arc<dyn SelectionStore>,
    pub stream_state: watch::Receiver<ConnState>,
}

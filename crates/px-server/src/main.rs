//! # px-server
//!
//! Main entry point for the PX price gateway.
//!
//! Loads a JSON configuration file, opens the persisted price table, warms
//! the live caches, starts the stream client and the derived-cache updater,
//! and serves the HTTP API until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! px-server config.json --log-level info
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use anyhow::Result;
use clap::Parser;
use tracing::info;

mod auth;
mod db;
mod error;
mod routes;
mod state;

use px_account::resolver::{FileSelectionStore, SelectionStore};
use px_account::snapshot::TradingSnapshotCache;
use px_account::{AccountDirectory, InMemoryDirectory};
use px_candles::{CandleProxyCache, RestBarProvider};
use px_core::config::AppConfig;
use px_core::price_cache::PriceCache;
use px_core::time_util;
use px_core::types::AccountSnapshot;
use px_feed::ingest::rest::RestSpotSource;
use px_feed::ingest::synthetic::SyntheticSource;
use px_feed::ingest::{PriceIngestionJob, PriceSource};
use px_feed::stream::{StreamClient, StreamConfig};
use px_feed::updater::{DerivedCacheUpdater, QuoteCache};

use crate::db::SqlitePriceTable;
use crate::state::AppState;

/// PX Price Gateway Server.
#[derive(Parser)]
#[command(name = "px-server", about = "PX Price Gateway Server")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Initialize logging
    px_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "px-server");

    // 2. Load configuration
    let config = match &cli.config {
        Some(path) => px_core::config::load_config(path)?,
        None => AppConfig::default(),
    };
    let listen = config.effective_listen();
    info!("px-server starting — listen={listen}");

    let catalog = config.build_catalog();
    let table = Arc::new(SqlitePriceTable::open(config.effective_db_path())?);

    // 3. Warm the live caches from the persisted price table; instruments
    // with no row yet get a bootstrap quote so the quote API is never empty.
    let prices = Arc::new(PriceCache::new());
    let quotes = Arc::new(QuoteCache::new());
    let now_ms = time_util::now_ms();
    let mut seed = AHashMap::new();
    for row in table.load_all()? {
        if let Some(spec) = catalog.get(&row.symbol) {
            quotes.seed(spec, row.current_price, row.last_updated_ms);
            seed.insert(row.symbol.clone(), row.current_price);
        }
    }
    if !seed.is_empty() {
        prices.set_many(&seed, now_ms);
        info!("warmed {} symbol(s) from price table", seed.len());
    }
    for spec in catalog.specs() {
        if quotes.get(&spec.symbol).is_none() {
            quotes.seed(spec, spec.bootstrap_price, now_ms);
        }
    }

    // 4. Derived-cache fan-out
    let snapshots = Arc::new(TradingSnapshotCache::new());
    let updater = DerivedCacheUpdater::new(catalog.clone(), quotes.clone(), snapshots.clone());
    let (sub_id, updater_task) = updater.spawn(&prices);

    // 5. Stream client
    let mut stream = StreamClient::new(StreamConfig {
        url: config.effective_feed_url(),
        reconnect_delay: Duration::from_secs(config.effective_reconnect_delay_sec()),
    });
    let stream_state = stream.state_watch();
    stream.start(prices.clone());

    // 6. Candle proxy
    let provider = Arc::new(RestBarProvider::new(
        config.effective_provider_base_url(),
        Duration::from_secs(config.effective_candle_timeout_sec()),
    ));
    let candles = CandleProxyCache::new(catalog.clone(), provider, config.effective_candle_capacity());

    // 7. Ingestion job
    let sources: Vec<Arc<dyn PriceSource>> = if config.live_ingestion() {
        vec![Arc::new(RestSpotSource::new(
            "spot-rest",
            config.effective_spot_base_url(),
            &catalog,
            Duration::from_secs(config.effective_ingest_timeout_sec()),
        ))]
    } else {
        vec![Arc::new(SyntheticSource::new(&catalog))]
    };
    let ingest_job = PriceIngestionJob::new(catalog.clone(), sources);

    // 8. Accounts and active-selection persistence
    let mut accounts: Vec<AccountSnapshot> = config
        .accounts
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|a| AccountSnapshot::flat(a.id, a.balance, a.realized_pnl.unwrap_or(0.0)))
        .collect();
    if accounts.is_empty() {
        accounts.push(AccountSnapshot::flat("acct-1", 10_000.0, 0.0));
    }
    let directory: Arc<dyn AccountDirectory> = Arc::new(InMemoryDirectory::new(accounts));
    let selection: Arc<dyn SelectionStore> =
        Arc::new(FileSelectionStore::new(config.effective_selection_path()));

    let state = Arc::new(AppState {
        config,
        catalog,
        prices: prices.clone(),
        quotes,
        snapshots,
        candles,
        table,
        ingest_job,
        directory,
        selection,
        stream_state,
    });

    // 9. Serve until shutdown
    let app = routes::api_router().with_state(state);
    let listener = tokio::net::TcpListener::bind(listen.as_str()).await?;
    info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    // 10. Tear down the streaming path
    info!("shutdown signal received");
    stream.stop().await;
    prices.unsubscribe(sub_id);
    let _ = updater_task.await;

    info!("px-server stopped — goodbye");
    Ok(())
}

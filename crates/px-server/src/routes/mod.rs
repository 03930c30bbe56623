pub mod candles;
pub mod ingest;
pub mod market;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(candles::routes())
        .merge(ingest::routes())
        .merge(market::routes())
}

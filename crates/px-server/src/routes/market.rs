//! Live market reads: price snapshot, derived quotes, account snapshot,
//! health.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use px_account::resolver;
use px_core::time_util;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    #[serde(default)]
    account: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/prices", get(api_prices))
        .route("/api/quotes", get(api_quotes))
        .route("/api/snapshot", get(api_snapshot))
}

async fn api_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "now_ms": time_util::now_ms(),
        "stream_state": state.stream_state.borrow().as_str(),
        "price_count": state.prices.len(),
        "instrument_count": state.catalog.len(),
    }))
}

/// Non-reactive read of the raw price map. `last_update_ms` lets callers
/// detect staleness during stream disruption.
async fn api_prices(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "prices": state.prices.snapshot(),
        "last_update_ms": state.prices.last_update_ms(),
    }))
}

async fn api_quotes(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut quotes = state.quotes.snapshot();
    quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Json(json!({ "quotes": quotes }))
}

/// Trading snapshot for the requested (or active) account. Built from the
/// directory on a cold miss, served from the patched cache afterwards.
async fn api_snapshot(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SnapshotQuery>,
) -> Result<Json<Value>, ApiError> {
    let accounts = state.directory.accounts();

    let account = match &q.account {
        Some(id) => accounts
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::BadRequest(format!("unknown account: {id}")))?,
        None => resolver::resolve_active_account(&accounts, state.selection.as_ref())
            .cloned()
            .ok_or_else(|| ApiError::BadRequest("no accounts available".to_string()))?,
    };

    if let Some(snapshot) = state.snapshots.get(&account.id) {
        return Ok(Json(json!({ "snapshot": snapshot, "cached": true })));
    }

    let positions = state.directory.open_positions(&account.id);
    let prices = state.prices.snapshot();
    let snapshot = state.snapshots.insert(account, positions, prices);
    Ok(Json(json!({ "snapshot": snapshot, "cached": false })))
}

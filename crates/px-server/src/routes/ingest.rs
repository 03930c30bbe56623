//! Ingestion trigger endpoint — invoked on a fixed schedule by an external
//! scheduler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use px_core::time_util;

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/ingest/run", get(api_ingest_run))
}

async fn api_ingest_run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    auth::require_bearer(&headers, state.config.effective_ingest_token().as_deref())?;

    let summary = state.ingest_job.run(state.table.as_ref()).await;

    let mut body = json!({
        "ok": true,
        "updated": summary.updated,
        "ts": time_util::now_ms(),
        "symbols": summary.symbols,
    });
    if !summary.errors.is_empty() {
        body["errors"] = json!(summary.errors);
    }
    Ok(Json(body))
}

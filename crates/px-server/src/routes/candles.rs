//! Historical candle query endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use px_candles::CandleError;
use px_core::types::Granularity;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    symbol: String,
    #[serde(default = "default_timeframe")]
    timeframe: String,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_limit() -> u32 {
    500
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/candles", get(api_candles))
}

async fn api_candles(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CandleQuery>,
) -> Result<Json<Value>, ApiError> {
    let granularity = Granularity::parse(&q.timeframe)
        .ok_or_else(|| CandleError::InvalidTimeframe(q.timeframe.clone()))?;

    let (bars, cached) = state.candles.get_bars(&q.symbol, granularity, q.limit).await?;

    Ok(Json(json!({
        "candles": bars,
        "symbol": q.symbol,
        "timeframe": granularity.as_str(),
        "cached": cached,
    })))
}

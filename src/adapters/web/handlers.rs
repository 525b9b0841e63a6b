//! HTTP request handlers for web adapter.

use axum::{Json, body::Bytes, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::domain::engine::run_strategy;
use crate::domain::error::StratsimError;
use crate::domain::normalizer::normalize;
use crate::domain::response::BacktestResponse;
use crate::domain::strategy::StrategySummary;

use super::{AppState, WebError};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn backtest(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BacktestResponse>, WebError> {
    let candidate = parse_body(&body)?;
    let response = tokio::task::spawn_blocking(move || {
        run_strategy(
            &candidate,
            state.data.as_ref(),
            state.timeframe,
            &state.backtest,
        )
    })
    .await
    .map_err(|e| WebError::internal(format!("backtest task failed: {}", e)))??;

    info!(trades = response.trades, "backtest served");
    Ok(Json(response))
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StrategySummary>, WebError> {
    let candidate = parse_body(&body)?;
    let rule = tokio::task::spawn_blocking(move || normalize(&candidate, state.data.as_ref()))
        .await
        .map_err(|e| WebError::internal(format!("validation task failed: {}", e)))??;
    Ok(Json(rule.summary()))
}

pub async fn not_found() -> WebError {
    WebError::not_found("not found")
}

/// Body text that is not JSON at all is still a malformed strategy.
fn parse_body(body: &[u8]) -> Result<Value, StratsimError> {
    serde_json::from_slice(body)
        .map_err(|e| StratsimError::malformed(format!("request body is not valid JSON: {}", e)))
}

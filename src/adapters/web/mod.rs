//! HTTP JSON adapter.
//!
//! Exposes the strategy pipeline over axum. Handlers move the synchronous
//! engine onto the blocking pool so a long backtest never stalls the
//! runtime's worker threads.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::backtest::BacktestConfig;
use crate::ports::data_port::{MarketData, Timeframe};

pub struct AppState {
    pub data: Arc<dyn MarketData + Send + Sync>,
    pub timeframe: Timeframe,
    pub backtest: BacktestConfig,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/backtest", post(handlers::backtest))
        .route("/validate", post(handlers::validate))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

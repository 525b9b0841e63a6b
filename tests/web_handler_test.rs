#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Health endpoint reports status and version
//! - Backtest returns the response payload
//! - Each error family maps to its status with an `{"error"}` body
//! - Validate echoes the normalized strategy summary

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use stratsim::adapters::web::{AppState, build_router};
use stratsim::domain::backtest::BacktestConfig;
use stratsim::ports::data_port::Timeframe;
use tower::ServiceExt;

use common::*;

fn create_test_app() -> Router {
    let port = rsi_dip_port()
        .with_bars("SHORT", generate_bars("2024-01-01", 10, 100.0))
        .with_error("BROKEN", "file unreadable");

    let state = AppState {
        data: Arc::new(port),
        timeframe: Timeframe::Daily,
        backtest: BacktestConfig::default(),
    };
    build_router(state)
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = create_test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn rsi_candidate(ticker: &str) -> String {
    json!({
        "ticker": ticker,
        "action": "buy",
        "conditions": [{"indicator": "RSI", "operator": "<", "value": 30}]
    })
    .to_string()
}

fn assert_error_only(body: &Value) {
    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 1);
    assert!(obj["error"].is_string());
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) =
            send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) =
            send(Request::builder().uri("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_error_only(&body);
    }
}

mod backtest_tests {
    use super::*;

    #[tokio::test]
    async fn backtest_returns_response() {
        let (status, body) = send(post_json("/backtest", rsi_candidate("TEST"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["trades"], 1);
        assert_eq!(body["return"].as_f64(), Some(4.4));
        assert_eq!(body["win_rate"].as_f64(), Some(100.0));
        assert_eq!(body["strategySummary"]["conditions"][0]["indicator"], "RSI(14)");
        assert_eq!(body["chart"]["markers"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_strategy_is_400() {
        let body = json!({"ticker": "TEST", "action": "buy", "conditions": []}).to_string();
        let (status, body) = send(post_json("/backtest", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_only(&body);
        assert!(body["error"].as_str().unwrap().contains("conditions list is empty"));
    }

    #[tokio::test]
    async fn invalid_json_body_is_400() {
        let (status, body) = send(post_json("/backtest", "{not json".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error_only(&body);
    }

    #[tokio::test]
    async fn failing_source_is_404() {
        let (status, body) = send(post_json("/backtest", rsi_candidate("BROKEN"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_error_only(&body);
    }

    #[tokio::test]
    async fn short_history_is_422() {
        let (status, body) = send(post_json("/backtest", rsi_candidate("SHORT"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_error_only(&body);
        assert!(body["error"].as_str().unwrap().contains("RSI(14)"));
    }
}

mod validate_tests {
    use super::*;

    #[tokio::test]
    async fn validate_returns_summary() {
        let candidate = json!({
            "ticker": "test",
            "action": "short",
            "conditions": [{"indicator": "PRICE", "operator": "crosses above", "value": "MA50"}]
        })
        .to_string();
        let (status, body) = send(post_json("/validate", candidate)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "TEST");
        assert_eq!(body["action"], "sell");
        assert_eq!(body["conditions"][0]["indicator"], "PRICE");
        assert_eq!(body["conditions"][0]["operator"], "crosses_above");
        assert_eq!(body["conditions"][0]["value"], "SMA(50)");
    }

    #[tokio::test]
    async fn validate_rejects_both_actions() {
        let candidate = json!({
            "ticker": "TEST",
            "action": ["buy", "sell"],
            "conditions": [{"indicator": "RSI", "operator": "<", "value": 30}]
        })
        .to_string();
        let (status, body) = send(post_json("/validate", candidate)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("both buy and sell"));
    }
}

//! Admin HTTP surface driven through the full middleware stack

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use crash_operator::{
    api::{build_app, AppState},
    chain::memory::{ChainCall, InMemoryChain},
    config::{ApiConfig, GameDefaults},
    coordinator::Coordinator,
    games::GameConfig,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

async fn app_with(chain: Arc<InMemoryChain>, bootstrap: bool) -> (Router, Arc<Coordinator>) {
    let coordinator = Arc::new(Coordinator::new(chain, Duration::from_secs(5)));
    if bootstrap {
        coordinator
            .ensure_initialized(&GameDefaults::default())
            .await
            .unwrap();
    }
    let app = build_app(Arc::new(AppState::new(coordinator.clone())), &ApiConfig::default());
    (app, coordinator)
}

fn initialized_chain(total: u64) -> Arc<InMemoryChain> {
    Arc::new(InMemoryChain::with_config(GameConfig {
        house_edge_percent: 5,
        min_bet: 1_000_000,
        max_bet: 100_000_000,
        total_games_completed: total,
    }))
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, request_id, body)
}

fn json_of(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_health_carries_request_id() {
    let (app, _) = app_with(initialized_chain(0), true).await;

    let (status, request_id, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(request_id.is_some());
    assert_eq!(json_of(&body)["status"], "ok");
}

#[tokio::test]
async fn test_initialize_with_empty_body_uses_default_edge() {
    let chain = Arc::new(InMemoryChain::new());
    let (app, _) = app_with(chain.clone(), false).await;

    let (status, _, body) = send(&app, post("/admin/initialize", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["ok"], true);
    assert_eq!(chain.calls(), vec![ChainCall::Initialize(5)]);
}

#[tokio::test]
async fn test_initialize_twice_forwards_error() {
    let (app, _) = app_with(initialized_chain(0), true).await;

    let (status, _, body) = send(&app, post("/admin/initialize", r#"{"houseEdge": 5}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_of(&body);
    assert!(body["error"].as_str().unwrap().contains("already initialized"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_update_config_partial() {
    let chain = initialized_chain(0);
    let (app, _) = app_with(chain.clone(), true).await;

    let (status, _, _) = send(&app, post("/admin/update-config", r#"{"houseEdge": 7}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let config = chain.config().unwrap();
    assert_eq!(config.house_edge_percent, 7);
    assert_eq!(config.min_bet, 1_000_000);
    assert_eq!(config.max_bet, 100_000_000);
}

#[tokio::test]
async fn test_update_config_accepts_string_amounts() {
    let chain = initialized_chain(0);
    let (app, _) = app_with(chain.clone(), true).await;

    let (status, _, _) = send(
        &app,
        post("/admin/update-config", r#"{"minBet": "2000000", "maxBet": 50000000}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let config = chain.config().unwrap();
    assert_eq!(config.min_bet, 2_000_000);
    assert_eq!(config.max_bet, 50_000_000);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = app_with(initialized_chain(0), true).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/admin/update-config")
        .header("x-request-id", "req-42")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, request_id, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(request_id.as_deref(), Some("req-42"));
    let body = json_of(&body);
    assert_eq!(body["request_id"], "req-42");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_or_oversized_fields_are_failed_calls() {
    let chain = initialized_chain(0);
    let (app, _) = app_with(chain.clone(), true).await;

    for body in [
        r#"{"crashPoint": 250}"#,
        r#"{"roundId": 1}"#,
        r#"{"roundId": 1, "crashPoint": 70000}"#,
    ] {
        let (status, request_id, response) = send(&app, post("/admin/start", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body {}", body);
        let response = json_of(&response);
        assert!(response["error"].is_string());
        assert_eq!(response["request_id"].as_str(), request_id.as_deref());
    }
    assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_manual_start_and_end() {
    let chain = initialized_chain(9);
    let (app, coordinator) = app_with(chain.clone(), true).await;

    let (status, _, _) = send(&app, post("/admin/start", r#"{"roundId": 50, "crashPoint": 250}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(chain.round(50).unwrap().active);
    assert_eq!(coordinator.next_round_id().await, 51);

    let (status, _, body) = send(&app, post("/admin/start", r#"{"roundId": 51, "crashPoint": 300}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_of(&body)["error"].as_str().unwrap().contains("in progress"));

    let (status, _, _) = send(&app, post("/admin/end", r#"{"roundId": "50"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!chain.round(50).unwrap().active);
}

#[tokio::test]
async fn test_start_rejects_out_of_range_crash_point() {
    let chain = initialized_chain(0);
    let (app, _) = app_with(chain.clone(), true).await;

    let (status, _, _) = send(&app, post("/admin/start", r#"{"roundId": 1, "crashPoint": 50}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_end_without_round() {
    let (app, _) = app_with(initialized_chain(0), true).await;

    let (status, _, body) = send(&app, post("/admin/end", r#"{"roundId": 1}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_of(&body)["error"].is_string());
}

#[tokio::test]
async fn test_status_and_metrics() {
    let (app, coordinator) = app_with(initialized_chain(3), true).await;
    coordinator.begin_next_round().await.unwrap();

    let (status, _, body) = send(&app, get("/admin/status")).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_of(&body);
    assert_eq!(body["nextRoundId"], 5);
    assert_eq!(body["currentRound"]["roundId"], 4);
    assert_eq!(body["currentRound"]["status"], "active");

    let (status, _, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("crash_round_transitions_total"));
    assert!(text.contains("crash_round_active 1"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = app_with(initialized_chain(0), true).await;
    let (status, _, _) = send(&app, get("/admin/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_json_error_shape() {
    let (app, _) = app_with(initialized_chain(0), true).await;
    let (_, _, body) = send(&app, post("/admin/update-config", "{}")).await;
    let body = json_of(&body);
    assert_eq!(body.as_object().unwrap().len(), 2);
    assert_eq!(body, json!({"error": body["error"], "request_id": body["request_id"]}));
}

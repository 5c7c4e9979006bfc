#![cfg(feature = "server")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use chainpulse::insight::NoTextGenerator;
use chainpulse::transport::{router, AppState};
use chainpulse::{Dashboard, DashboardConfig};

fn app() -> (Router, Arc<Dashboard>) {
    let dashboard = Arc::new(Dashboard::new(DashboardConfig::default(), Arc::new(NoTextGenerator)));
    (router(AppState::new(Arc::clone(&dashboard))), dashboard)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn simulate_acknowledges_and_publishes() {
    let (app, dashboard) = app();
    let mut rx = dashboard.listen();

    let (status, body) = send(&app, post("/api/simulate", &json!({ "scenario": "demand_surge" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Simulation for demand_surge started.");
    let mut topics = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        topics.push(envelope.topic.to_string());
    }
    assert!(topics.contains(&"simulation_result".to_string()));
}

#[tokio::test]
async fn simulate_without_scenario_is_rejected() {
    let (app, _dashboard) = app();

    let (status, body) = send(&app, post("/api/simulate", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No scenario provided");
}

#[tokio::test]
async fn approve_decision_executes() {
    let (app, dashboard) = app();
    let mut rx = dashboard.listen();

    let decision = json!({ "decision": { "id": 1_700_000_000_000_u64, "type": "transfer_inventory" } });
    let (status, body) = send(&app, post("/api/approve_decision", &decision)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Decision approved and executed.");
    assert_eq!(rx.try_recv().unwrap().topic.as_str(), "decision_made");
    assert_eq!(dashboard.decisions.pending_reports(), 1);
}

async fn approve_and_collect(body: Value) -> (StatusCode, Value, Vec<Value>) {
    let (app, dashboard) = app();
    let mut rx = dashboard.listen();

    let (status, ack) = send(&app, post("/api/approve_decision", &body)).await;

    let mut made = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        if envelope.topic.as_str() == "decision_made" {
            made.push(serde_json::to_value(envelope.payload.as_ref()).unwrap());
        }
    }
    (status, ack, made)
}

#[tokio::test]
async fn approve_accepts_a_string_id() {
    let decision = json!({ "id": "1700000000000", "type": "user_approved" });

    let (status, body, made) = approve_and_collect(json!({ "decision": decision.clone() })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Decision approved and executed.");
    assert_eq!(made, vec![decision]);
}

#[tokio::test]
async fn approve_accepts_unexpected_field_types() {
    for decision in [json!({ "id": 1.5e12, "type": "reroute_shipment" }), json!({ "id": 1, "type": 5 })] {
        let (status, _, made) = approve_and_collect(json!({ "decision": decision.clone() })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(made, vec![decision]);
    }
}

#[tokio::test]
async fn approve_accepts_a_bare_string() {
    let (status, _, made) = approve_and_collect(json!({ "decision": "approve-it" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(made, vec![json!("approve-it")]);
}

#[tokio::test]
async fn approve_with_null_decision_is_rejected() {
    let (status, body, made) = approve_and_collect(json!({ "decision": null })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No decision provided");
    assert!(made.is_empty());
}

#[tokio::test]
async fn approve_without_decision_is_rejected() {
    let (app, dashboard) = app();
    let mut rx = dashboard.listen();

    let (status, body) = send(&app, post("/api/approve_decision", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No decision provided");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn feedback_is_acknowledged() {
    let (app, _dashboard) = app();

    let (status, body) = send(
        &app,
        post("/api/feedback", &json!({ "feedback": "useful", "decision": { "id": 3 } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Feedback received.");
}

#[tokio::test]
async fn metrics_are_empty_until_the_first_tick() {
    let (app, dashboard) = app();

    let (status, body) = send(&app, get("/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let snapshot = dashboard.metrics.tick();
    let (_, body) = send(&app, get("/api/metrics")).await;
    assert_eq!(body["webTraffic"], snapshot.web_traffic);
}

#[tokio::test]
async fn health_reports_wiring() {
    let (app, _dashboard) = app();

    let (status, body) = send(&app, get("/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["subscribers"].as_u64().unwrap() > 0);
    assert_eq!(body["ingested"], 0);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _dashboard) = app();

    let (status, _) = send(&app, get("/api/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Trace API Integration Tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use trace_types::TraceEvent;
use trace_viz::api;
use trace_viz::app_state::AppState;
use trace_viz::config::Config;
use trace_viz::sse::SseDecoder;

async fn setup_test_app() -> axum::Router {
    let app_state = AppState::spawn(&Config::default())
        .await
        .expect("Failed to spawn trace session");

    let api_state = api::ApiState {
        app_state: Arc::new(app_state),
    };

    api::router().with_state(api_state)
}

async fn json_response(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("Request failed");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let value: Value = serde_json::from_slice(&body).expect("Invalid JSON response");
    (status, value)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    json_response(app, req).await
}

async fn post_event(app: &axum::Router, event: &TraceEvent) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(event).unwrap()))
        .unwrap();
    json_response(app, req).await
}

async fn post_parent_and_child(app: &axum::Router) {
    for event in [
        TraceEvent::started("a", None, "root", 1000),
        TraceEvent::started("b", Some("a"), "child", 1500),
        TraceEvent::completed("b", 50.0, 2000),
        TraceEvent::completed("a", 1000.0, 3000),
    ] {
        let (status, _) = post_event(app, &event).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "trace-viz");
}

#[tokio::test]
async fn test_post_event_reports_outcome() {
    let app = setup_test_app().await;

    let (status, body) = post_event(&app, &TraceEvent::started("a", None, "root", 1)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"], "started");
    assert_eq!(body["attached"], false);

    let (_, body) = post_event(&app, &TraceEvent::completed("ghost", 1.0, 2)).await;
    assert_eq!(body["outcome"], "dropped");

    let (_, body) = post_event(&app, &TraceEvent::failed("a", 3.0, 3)).await;
    assert_eq!(body["outcome"], "transitioned");
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_malformed_event_rejected() {
    let app = setup_test_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/events")
        .body(Body::from(r#"{"type":"paused","id":"a"}"#))
        .unwrap();

    let (status, body) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_EVENT");

    // Nothing reached the session
    let (_, timeline) = get_json(&app, "/api/timeline").await;
    assert_eq!(timeline.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_tree_endpoints() {
    let app = setup_test_app().await;
    post_parent_and_child(&app).await;

    let (status, roots) = get_json(&app, "/api/traces").await;
    assert_eq!(status, StatusCode::OK);
    let roots = roots.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], "a");
    assert_eq!(roots[0]["status"], "completed");
    assert_eq!(roots[0]["childIds"], json!(["b"]));

    let (_, children) = get_json(&app, "/api/traces/a/children").await;
    assert_eq!(children[0]["id"], "b");
    assert_eq!(children[0]["durationMs"], 50.0);

    let (status, details) = get_json(&app, "/api/traces/b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["label"], "child");
    assert_eq!(details["childCount"], 0);
    assert_eq!(details["ancestors"], json!(["a"]));

    let (status, body) = get_json(&app, "/api/traces/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = get_json(&app, "/api/traces/nope/children").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stats_endpoints() {
    let app = setup_test_app().await;
    post_parent_and_child(&app).await;

    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["counts"]["running"], 0);
    assert_eq!(stats["counts"]["completed"], 2);
    assert_eq!(stats["latency"]["count"], 2);
    assert_eq!(stats["latency"]["mean"], 525.0);
    assert_eq!(stats["operations"], json!(["child", "root"]));

    let (_, latency) = get_json(&app, "/api/stats/latency?operation=child").await;
    assert_eq!(latency["count"], 1);
    assert_eq!(latency["p99"], 50.0);

    let (_, latency) = get_json(&app, "/api/stats/latency?operation=").await;
    assert_eq!(latency["count"], 2);

    let (_, per_op) = get_json(&app, "/api/stats/operations").await;
    assert_eq!(per_op["root"]["max"], 1000.0);
}

#[tokio::test]
async fn test_operation_filter_round_trip() {
    let app = setup_test_app().await;
    post_parent_and_child(&app).await;

    let req = Request::builder()
        .method("PUT")
        .uri("/api/filter")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"operation":"root"}"#))
        .unwrap();
    let (status, stats) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["operationFilter"], "root");
    assert_eq!(stats["latency"]["count"], 1);
    assert_eq!(stats["latency"]["mean"], 1000.0);

    let req = Request::builder()
        .method("PUT")
        .uri("/api/filter")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (_, stats) = json_response(&app, req).await;
    assert_eq!(stats["operationFilter"], Value::Null);
    assert_eq!(stats["latency"]["count"], 2);
}

#[tokio::test]
async fn test_view_endpoints() {
    let app = setup_test_app().await;
    post_parent_and_child(&app).await;

    let (_, layout) = get_json(&app, "/api/layout").await;
    let positions = layout["positions"].as_array().unwrap();
    assert_eq!(positions.len(), 2);
    assert_eq!(layout["connections"].as_array().unwrap().len(), 1);
    assert_eq!(layout["width"], 510);
    assert_eq!(layout["height"], 162);

    let (_, gantt) = get_json(&app, "/api/gantt?scale=2").await;
    assert_eq!(gantt["scale"], 2.0);
    let rows = gantt["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["node"]["id"], "a");
    assert_eq!(rows[1]["depth"], 1);

    let (_, timeline) = get_json(&app, "/api/timeline").await;
    let timeline = timeline.as_array().unwrap();
    assert_eq!(timeline.len(), 4);
    assert_eq!(timeline[0]["detail"], "Started");
    assert_eq!(timeline[2]["detail"], "50.0ms");
}

#[tokio::test]
async fn test_reset_clears_session() {
    let app = setup_test_app().await;
    post_parent_and_child(&app).await;
    let (_, before) = get_json(&app, "/api/stats").await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/reset")
        .body(Body::empty())
        .unwrap();
    let (status, body) = json_response(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(body["sessionId"], before["sessionId"]);

    let (_, roots) = get_json(&app, "/api/traces").await;
    assert_eq!(roots.as_array().unwrap().len(), 0);
    let (_, stats) = get_json(&app, "/api/stats").await;
    assert_eq!(stats["counts"]["completed"], 0);
}

#[tokio::test]
async fn test_event_stream_relays_posted_events() {
    let app = setup_test_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/events")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(response.headers()["cache-control"], "no-cache");

    let event = TraceEvent::started("a", None, "root", 1).with_dispatcher("Dispatchers.IO");
    post_event(&app, &event).await;

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("No SSE frame received")
        .expect("Stream ended")
        .expect("Body error");
    let bytes = frame.into_data().expect("Expected a data frame");
    let chunk = std::str::from_utf8(&bytes).unwrap();
    assert!(chunk.starts_with("data: "));

    let mut decoder = SseDecoder::new();
    let decoded = decoder.push(chunk);
    assert_eq!(decoded, vec![Ok(event)]);
}

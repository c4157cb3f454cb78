// Integration tests for the HTTP control surface
//
// Requests go straight through the router with `oneshot`; no socket is bound.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::Harness;
use std::time::Duration;
use tower::ServiceExt;
use voicelog::{create_router, AppState, ChannelId, SessionRegistry};

fn app(registry: &SessionRegistry) -> axum::Router {
    create_router(AppState::new(registry.clone()))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
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
async fn test_health_check() {
    let harness = Harness::new();
    let registry = harness.registry();

    let response = app(&registry).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_spawn_conflict_and_stop() {
    let harness = Harness::new();
    let registry = harness.registry();
    let body = r#"{"guild_id": 1, "channel_id": 7}"#;

    let response = app(&registry)
        .oneshot(post_json("/sessions", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(registry.get(ChannelId(7)).await.is_some());

    let response = app(&registry)
        .oneshot(post_json("/sessions", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app(&registry).oneshot(get("/sessions/7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&registry)
        .oneshot(post_json("/sessions/7/stop", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let report = registry.stop_all(Duration::from_secs(5)).await;
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let harness = Harness::new();
    let registry = harness.registry();

    let response = app(&registry).oneshot(get("/sessions/99")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(&registry)
        .oneshot(post_json("/sessions/99/stop", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_events_are_accepted_for_any_channel() {
    let harness = Harness::new();
    let registry = harness.registry();
    registry.spawn(common::GUILD, ChannelId(8)).await.unwrap();

    let response = app(&registry)
        .oneshot(post_json("/sessions/8/events", r#"{"kind": "member_join"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // No session: still accepted, just not delivered
    let response = app(&registry)
        .oneshot(post_json("/sessions/9/events", r#"{"kind": "member_leave"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app(&registry)
        .oneshot(post_json("/sessions/8/events", r#"{"kind": "member_wave"}"#))
        .await
        .unwrap();
    assert!(response.status().is_client_error());

    registry.stop_all(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn test_spawn_during_shutdown_is_unavailable() {
    let harness = Harness::new();
    let registry = harness.registry();
    registry.stop_all(Duration::from_secs(1)).await;

    let response = app(&registry)
        .oneshot(post_json("/sessions", r#"{"guild_id": 1, "channel_id": 7}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app(&registry).oneshot(get("/sessions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

//! Room API integration tests
//!
//! Exercises the admin surface against an in-memory service context with
//! `tower::ServiceExt::oneshot`, no network involved.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use signal_api::{create_app, AppState};
use signal_common::{AppConfig, AppSettings, Environment, HealthConfig, QueueConfig, ServerConfig};
use signal_service::{EventPublisher, ServiceContext};
use signal_store::{InMemoryPeerConnectionRepository, InMemoryRoomRepository};

fn test_config() -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "signal-server-test".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        api: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        ws_path: "/signal".to_string(),
        max_connections_per_room: 20,
        queue: QueueConfig {
            drain_ms: 100,
            batch_size: 10,
        },
        health: HealthConfig {
            stale_connection_ms: 30_000,
            max_reconnect_attempts: 3,
        },
        room_stats_monitor_ms: 30_000,
    }
}

fn app() -> Router {
    let ctx = ServiceContext::new(
        Arc::new(InMemoryRoomRepository::new()),
        Arc::new(InMemoryPeerConnectionRepository::new()),
        Arc::new(EventPublisher::new()),
    );
    create_app(AppState::new(ctx, test_config()))
}

async fn request(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn create_body() -> Value {
    json!({
        "ownerId": "u1",
        "maxPlayers": 4,
        "allowRelay": true,
        "latencyTargetMs": 100,
        "opusBitrate": 64000
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_room_returns_201_with_id() {
    let app = app();
    let (status, body) = request(&app, "POST", "/rooms", Some(create_body())).await;

    assert_eq!(status, StatusCode::CREATED);
    let room_id = body["roomId"].as_str().unwrap();
    assert!(!room_id.is_empty());

    let (status, body) = request(&app, "GET", &format!("/rooms/{room_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["ownerId"], "u1");
    assert_eq!(body["room"]["players"], json!(["u1"]));
    assert_eq!(body["room"]["rules"]["maxPlayers"], 4);
    assert_eq!(body["room"]["active"], true);
}

#[tokio::test]
async fn test_create_room_rejects_zero_max_players() {
    let app = app();
    let mut body = create_body();
    body["maxPlayers"] = json!(0);

    let (status, _) = request(&app, "POST", "/rooms", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_room_is_404() {
    let app = app();
    let (status, body) = request(&app, "GET", "/rooms/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_ROOM");
}

#[tokio::test]
async fn test_update_rules_owner_only() {
    let app = app();
    let (_, body) = request(&app, "POST", "/rooms", Some(create_body())).await;
    let room_id = body["roomId"].as_str().unwrap().to_string();

    let rules = |owner: &str| {
        json!({
            "ownerId": owner,
            "maxPlayers": 6,
            "allowRelay": false,
            "latencyTargetMs": 80,
            "opusBitrate": 96000
        })
    };

    // Non-owner is forbidden
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/rooms/{room_id}/rules"),
        Some(rules("intruder")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "NOT_ROOM_OWNER");

    // Owner succeeds
    let (status, body) = request(
        &app,
        "PATCH",
        &format!("/rooms/{room_id}/rules"),
        Some(rules("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["rules"]["maxPlayers"], 6);
    assert_eq!(body["room"]["rules"]["allowRelay"], false);
}

#[tokio::test]
async fn test_update_rules_unknown_room_is_404() {
    let app = app();
    let (status, _) = request(
        &app,
        "PATCH",
        "/rooms/ghost/rules",
        Some(json!({
            "ownerId": "u1",
            "maxPlayers": 6,
            "allowRelay": false,
            "latencyTargetMs": 80,
            "opusBitrate": 96000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_room_owner_only() {
    let app = app();
    let (_, body) = request(&app, "POST", "/rooms", Some(create_body())).await;
    let room_id = body["roomId"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "DELETE",
        &format!("/rooms/{room_id}"),
        Some(json!({"ownerId": "intruder"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = request(
        &app,
        "DELETE",
        &format!("/rooms/{room_id}"),
        Some(json!({"ownerId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["room"]["active"], false);
}

#[tokio::test]
async fn test_delete_unknown_room_is_404() {
    let app = app();
    let (status, _) = request(
        &app,
        "DELETE",
        "/rooms/ghost",
        Some(json!({"ownerId": "u1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! End-to-end API tests over an isolated in-memory store per case.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use beacon_events::TelemetryStore;
use beacon_events::sqlite::{connection, migrations};
use beacon_server::auth::AuthConfig;
use beacon_server::{AppState, build_router};

const API_KEY: &str = "test-api-key";

fn test_app() -> Router {
    let pool = connection::open_in_memory().unwrap();
    {
        let conn = pool.get().unwrap();
        migrations::run(&conn).unwrap();
    }
    let store = Arc::new(TelemetryStore::new(pool));
    let metrics = PrometheusBuilder::new().build_recorder().handle();
    let state = Arc::new(AppState::new(store, metrics));
    build_router(state, AuthConfig::new(API_KEY))
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    request(app, "GET", uri, Some(API_KEY), None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    request(app, "POST", uri, Some(API_KEY), Some(body)).await
}

fn envelope(session_id: &str, hook: &str, timestamp: &str) -> Value {
    json!({
        "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
        "event": {"session_id": session_id, "hook_event_name": hook},
        "timestamp": timestamp,
    })
}

// ── Credential gate ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_token_is_rejected_everywhere() {
    let app = test_app();
    for uri in ["/api/v1/ping", "/api/v1/devices", "/api/v1/metrics"] {
        let (status, body) = request(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = request(
        &app,
        "POST",
        "/api/v1/events",
        None,
        Some(envelope("s1", "SessionStart", "2026-01-01T00:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_is_rejected_without_leaking_the_expected_one() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/api/v1/ping", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.to_string().contains(API_KEY));
}

#[tokio::test]
async fn ping_reports_server_version() {
    let app = test_app();
    let (status, body) = get(&app, "/api/v1/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["server_version"].is_string());
}

// ── Ingestion ────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_returns_created_with_id_and_timestamp() {
    let app = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/events",
        envelope("s1", "SessionStart", "2026-01-01T00:00:00Z"),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["timestamp"], "2026-01-01T00:00:00Z");
}

#[tokio::test]
async fn ingest_rejects_missing_fields_naming_them() {
    let app = test_app();

    let cases = [
        (
            json!({
                "device": {"device_id": "", "device_name": "mac1", "platform": "mac"},
                "event": {"session_id": "s1", "hook_event_name": "SessionStart"},
                "timestamp": "2026-01-01T00:00:00Z",
            }),
            "device_id",
        ),
        (
            json!({
                "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
                "event": {"session_id": "", "hook_event_name": "SessionStart"},
                "timestamp": "2026-01-01T00:00:00Z",
            }),
            "session_id",
        ),
        (
            json!({
                "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
                "event": {"session_id": "s1", "hook_event_name": ""},
                "timestamp": "2026-01-01T00:00:00Z",
            }),
            "hook_event_name",
        ),
        (
            json!({
                "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
                "event": {"session_id": "s1", "hook_event_name": "SessionStart"},
                "timestamp": "not a time",
            }),
            "timestamp",
        ),
    ];

    for (body, field) in cases {
        let (status, response) = post(&app, "/api/v1/events", body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{field}");
        assert_eq!(response["error"], "invalid_request");
        assert!(
            response["message"].as_str().unwrap().contains(field),
            "message should name {field}"
        );
    }
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/events")
        .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn duplicate_ingest_appends_twice_but_projects_once() {
    let app = test_app();
    let body = json!({
        "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
        "event": {
            "session_id": "s1",
            "hook_event_name": "UserPromptSubmit",
            "message": "first"
        },
        "timestamp": "2026-01-01T00:00:00Z",
    });

    let (status, _) = post(&app, "/api/v1/events", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&app, "/api/v1/events", body).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, feed) = get(&app, "/api/v1/sessions/s1/events").await;
    assert_eq!(feed["events"].as_array().unwrap().len(), 2);

    let (_, sessions) = get(&app, "/api/v1/sessions").await;
    let sessions = sessions["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["title"], "first");
}

// ── Lifecycle scenario ───────────────────────────────────────────────────

#[tokio::test]
async fn session_lifecycle_scenario() {
    let app = test_app();

    // SessionStart carrying a cwd.
    let (status, _) = post(
        &app,
        "/api/v1/events",
        json!({
            "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
            "event": {
                "session_id": "s1",
                "hook_event_name": "SessionStart",
                "cwd": "/home/x"
            },
            "timestamp": "2026-01-01T00:00:00Z",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, devices) = get(&app, "/api/v1/devices").await;
    let device = &devices["devices"].as_array().unwrap()[0];
    assert_eq!(device["device_id"], "d1");
    assert_eq!(device["first_seen"], "2026-01-01T00:00:00Z");
    assert_eq!(device["last_seen"], "2026-01-01T00:00:00Z");
    assert_eq!(device["active_sessions"], 1);

    let (_, sessions) = get(&app, "/api/v1/devices/d1/sessions").await;
    let session = &sessions["sessions"].as_array().unwrap()[0];
    assert_eq!(session["session_id"], "s1");
    assert_eq!(session["status"], "active");
    assert_eq!(session["cwd"], "/home/x");
    assert!(session.get("title").is_none() || session["title"].is_null());

    // Permission prompt: status changes, cwd stays.
    let (status, _) = post(
        &app,
        "/api/v1/events",
        json!({
            "device": {"device_id": "d1", "device_name": "mac1", "platform": "mac"},
            "event": {
                "session_id": "s1",
                "hook_event_name": "Notification",
                "notification_type": "permission_prompt"
            },
            "timestamp": "2026-01-01T00:01:00Z",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, sessions) = get(&app, "/api/v1/devices/d1/sessions").await;
    let session = &sessions["sessions"].as_array().unwrap()[0];
    assert_eq!(session["status"], "waiting_for_permission");
    assert_eq!(session["cwd"], "/home/x");

    // SessionEnd: the active filter now hides it.
    let (status, _) = post(
        &app,
        "/api/v1/events",
        envelope("s1", "SessionEnd", "2026-01-01T00:02:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, sessions) = get(&app, "/api/v1/devices/d1/sessions?active=true").await;
    assert_eq!(status, StatusCode::OK);
    assert!(sessions["sessions"].as_array().unwrap().is_empty());

    let (_, devices) = get(&app, "/api/v1/devices").await;
    assert_eq!(devices["devices"][0]["active_sessions"], 0);
}

// ── Reads ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_ids_yield_empty_lists() {
    let app = test_app();

    let (status, body) = get(&app, "/api/v1/devices/ghost/sessions").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["sessions"].as_array().unwrap().is_empty());

    let (status, body) = get(&app, "/api/v1/sessions/ghost/events").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["events"].as_array().unwrap().is_empty());

    let (status, body) = get(&app, "/api/v1/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["devices"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn event_feed_is_newest_first_and_pages_backward() {
    let app = test_app();
    for i in 0..5 {
        let (status, _) = post(
            &app,
            "/api/v1/events",
            envelope("s1", "UserPromptSubmit", &format!("2026-01-01T00:00:0{i}Z")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = get(&app, "/api/v1/sessions/s1/events?limit=2").await;
    let events = page["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    let first_id = events[0]["id"].as_i64().unwrap();
    let second_id = events[1]["id"].as_i64().unwrap();
    assert!(first_id > second_id);

    let (_, next) = get(
        &app,
        &format!("/api/v1/sessions/s1/events?limit=10&before={second_id}"),
    )
    .await;
    let older = next["events"].as_array().unwrap();
    assert_eq!(older.len(), 3);
    assert!(older.iter().all(|e| e["id"].as_i64().unwrap() < second_id));
}

// ── Push registration ────────────────────────────────────────────────────

#[tokio::test]
async fn push_register_upserts() {
    let app = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/push/register",
        json!({"device_id": "phone1", "platform": "ios", "token": "tok-a", "sandbox": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // Same key, new token: still one row behind the scenes, still ok.
    let (status, _) = post(
        &app,
        "/api/v1/push/register",
        json!({"device_id": "phone1", "platform": "ios", "token": "tok-b", "sandbox": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn push_register_validates_fields() {
    let app = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/push/register",
        json!({"device_id": "phone1", "platform": "", "token": "tok-a"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("platform"));
}

// ── Metrics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn metrics_endpoint_renders_with_auth() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/metrics")
        .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

//! Integration tests for `PUT /api/tasks/reorder` and
//! `POST /api/tasks/renormalize`.
//!
//! Drives the full router (auth extractor, JSON bodies, error mapping)
//! with `tower::ServiceExt::oneshot`.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use letsfocus_proto::api::CreateTaskRequest;
use letsfocus_proto::task::Task;
use letsfocus_server::auth::SessionRegistry;
use letsfocus_server::config::{OrderingConfig, SessionEntry};
use letsfocus_server::server::{AppState, router};
use letsfocus_server::store::TaskStore;
use serde_json::{Value, json};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ALICE: &str = "t-alice";
const BOB: &str = "t-bob";

fn app_with(ordering: OrderingConfig) -> Router {
    let sessions = SessionRegistry::from_entries(&[
        SessionEntry {
            token: ALICE.to_string(),
            owner: "alice".to_string(),
        },
        SessionEntry {
            token: BOB.to_string(),
            owner: "bob".to_string(),
        },
    ]);
    let state = AppState::new(TaskStore::new(), sessions).with_ordering(ordering);
    router(Arc::new(state))
}

fn app() -> Router {
    app_with(OrderingConfig::default())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
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

async fn create(app: &Router, token: &str, title: &str) -> Task {
    let body = serde_json::to_value(CreateTaskRequest::titled(title)).unwrap();
    let (status, value) = send(app, "POST", "/api/tasks", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(value).unwrap()
}

async fn list(app: &Router, token: &str) -> Vec<Task> {
    let (status, value) = send(app, "GET", "/api/tasks", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(value).unwrap()
}

async fn titles(app: &Router, token: &str) -> Vec<String> {
    list(app, token).await.into_iter().map(|t| t.title).collect()
}

async fn reorder(app: &Router, token: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", "/api/tasks/reorder", Some(token), Some(body)).await
}

/// Alice's A(1), B(2), C(3).
async fn seeded() -> (Router, Task, Task, Task) {
    let app = app();
    let a = create(&app, ALICE, "A").await;
    let b = create(&app, ALICE, "B").await;
    let c = create(&app, ALICE, "C").await;
    (app, a, b, c)
}

// ---------------------------------------------------------------------------
// Happy paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_between_neighbours() {
    let (app, a, b, c) = seeded().await;
    let (status, body) = reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 1.5);
    assert_eq!(body["renormalized"], false);
    assert!(body["message"].as_str().unwrap().contains("reordered"));
    assert_eq!(titles(&app, ALICE).await, ["A", "C", "B"]);
}

#[tokio::test]
async fn move_to_end() {
    let (app, a, _b, c) = seeded().await;
    let (status, body) = reorder(&app, ALICE, json!({ "taskId": a.id, "prevTaskId": c.id })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 4.0);
    assert_eq!(titles(&app, ALICE).await, ["B", "C", "A"]);
}

#[tokio::test]
async fn move_to_start() {
    let (app, a, _b, c) = seeded().await;
    let (status, body) = reorder(&app, ALICE, json!({ "taskId": c.id, "nextTaskId": a.id })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 0.0);
    assert_eq!(titles(&app, ALICE).await, ["C", "A", "B"]);
}

#[tokio::test]
async fn move_to_current_position_changes_nothing_else() {
    let (app, a, b, c) = seeded().await;
    let before = list(&app, ALICE).await;
    let (status, _) = reorder(
        &app,
        ALICE,
        json!({ "taskId": b.id, "prevTaskId": a.id, "nextTaskId": c.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = list(&app, ALICE).await;
    let ids = |list: &[Task]| list.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&before), ids(&after));
    assert_eq!(after[0].order, before[0].order);
    assert_eq!(after[2].order, before[2].order);
}

#[tokio::test]
async fn only_the_moved_task_is_written() {
    let (app, a, b, c) = seeded().await;
    reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;

    let after = list(&app, ALICE).await;
    let a_now = after.iter().find(|t| t.id == a.id).unwrap();
    let b_now = after.iter().find(|t| t.id == b.id).unwrap();
    assert_eq!(a_now.updated_at, a.updated_at);
    assert_eq!(b_now.updated_at, b.updated_at);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let (app, a, b, _c) = seeded().await;
    let (status, body) = send(
        &app,
        "PUT",
        "/api/tasks/reorder",
        None,
        Some(json!({ "taskId": a.id, "prevTaskId": b.id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn unknown_token_is_unauthenticated() {
    let (app, a, b, _c) = seeded().await;
    let (status, _) = reorder(&app, "t-mallory", json!({ "taskId": a.id, "prevTaskId": b.id })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_neighbours_is_bad_request() {
    let (app, a, ..) = seeded().await;
    let (status, body) = reorder(&app, ALICE, json!({ "taskId": a.id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn unknown_task_is_not_found_and_list_unchanged() {
    let (app, a, b, _c) = seeded().await;
    let before = list(&app, ALICE).await;
    let (status, body) = reorder(
        &app,
        ALICE,
        json!({
            "taskId": "0190a0b0-0000-7000-8000-000000000000",
            "prevTaskId": a.id,
            "nextTaskId": b.id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(list(&app, ALICE).await, before);
}

#[tokio::test]
async fn another_owners_task_is_not_found() {
    let (app, a, ..) = seeded().await;
    let x = create(&app, BOB, "X").await;
    let y = create(&app, BOB, "Y").await;

    let (status, _) = reorder(&app, ALICE, json!({ "taskId": x.id, "prevTaskId": y.id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = reorder(&app, BOB, json!({ "taskId": x.id, "prevTaskId": a.id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(titles(&app, BOB).await, ["X", "Y"]);
}

#[tokio::test]
async fn stale_neighbours_conflict() {
    let (app, a, _b, c) = seeded().await;
    let d = create(&app, ALICE, "D").await;
    let (status, body) = reorder(
        &app,
        ALICE,
        json!({ "taskId": d.id, "prevTaskId": a.id, "nextTaskId": c.id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(titles(&app, ALICE).await, ["A", "B", "C", "D"]);
}

#[tokio::test]
async fn completed_task_cannot_be_a_neighbour() {
    let (app, a, b, c) = seeded().await;
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/tasks/{}", b.id),
        Some(ALICE),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Re-normalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn renormalize_endpoint_respaces_list() {
    let (app, a, b, c) = seeded().await;
    reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;

    let (status, body) = send(&app, "POST", "/api/tasks/renormalize", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["renormalized"], 3);

    let orders: Vec<f64> = list(&app, ALICE).await.iter().map(|t| t.order).collect();
    assert_eq!(orders, [1000.0, 2000.0, 3000.0]);
    assert_eq!(titles(&app, ALICE).await, ["A", "C", "B"]);
}

#[tokio::test]
async fn exhausted_gap_renormalizes_during_reorder() {
    let app = app_with(OrderingConfig {
        min_gap: 0.3,
        renormalize_spacing: 1000.0,
    });
    let a = create(&app, ALICE, "A").await;
    let b = create(&app, ALICE, "B").await;
    let c = create(&app, ALICE, "C").await;

    reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;
    reorder(
        &app,
        ALICE,
        json!({ "taskId": b.id, "prevTaskId": a.id, "nextTaskId": c.id }),
    )
    .await;
    let (status, body) = reorder(
        &app,
        ALICE,
        json!({ "taskId": c.id, "prevTaskId": a.id, "nextTaskId": b.id }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], 1500.0);
    assert_eq!(body["renormalized"], true);
    assert_eq!(titles(&app, ALICE).await, ["A", "C", "B"]);
}

#[tokio::test]
async fn renormalize_is_owner_scoped() {
    let (app, ..) = seeded().await;
    create(&app, BOB, "X").await;

    let (_, body) = send(&app, "POST", "/api/tasks/renormalize", Some(BOB), None).await;
    assert_eq!(body["renormalized"], 1);

    let orders: Vec<f64> = list(&app, ALICE).await.iter().map(|t| t.order).collect();
    assert_eq!(orders, [1.0, 2.0, 3.0]);
}

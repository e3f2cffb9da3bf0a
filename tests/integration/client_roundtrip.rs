//! End-to-end tests: `ApiClient` and `TaskList` against an in-process
//! task server bound to an ephemeral port.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

use std::sync::Arc;

use letsfocus::client::{ApiClient, ClientError};
use letsfocus::tasks::{TaskError, TaskList};
use letsfocus::view::{MemoryPreferenceStore, PreferenceStore, SortKey, ViewPreferences};
use letsfocus_proto::api::{CreateTaskRequest, UpdateTaskRequest};
use letsfocus_proto::task::{Priority, TaskStatus};
use letsfocus_server::auth::SessionRegistry;
use letsfocus_server::config::{OrderingConfig, SessionEntry};
use letsfocus_server::server::{AppState, start_server_with_state};
use letsfocus_server::store::TaskStore;

async fn start(ordering: OrderingConfig) -> (String, tokio::task::JoinHandle<()>) {
    let sessions = SessionRegistry::from_entries(&[
        SessionEntry {
            token: "t-alice".to_string(),
            owner: "alice".to_string(),
        },
        SessionEntry {
            token: "t-bob".to_string(),
            owner: "bob".to_string(),
        },
    ]);
    let state = AppState::new(TaskStore::new(), sessions).with_ordering(ordering);
    let (addr, handle) = start_server_with_state("127.0.0.1:0", Arc::new(state))
        .await
        .expect("failed to start test server");
    (format!("http://{addr}"), handle)
}

async fn seed(client: &ApiClient, titles: &[&str]) {
    for title in titles {
        client
            .create_task(&CreateTaskRequest::titled(*title))
            .await
            .unwrap();
    }
}

fn titles(list: &TaskList) -> Vec<String> {
    list.active().map(|t| t.title.clone()).collect()
}

#[tokio::test]
async fn move_round_trip_matches_server() {
    let (url, handle) = start(OrderingConfig::default()).await;
    let client = ApiClient::new(&url, "t-alice").unwrap();
    seed(&client, &["A", "B", "C"]).await;

    let mut list = TaskList::new(client.list_tasks().await.unwrap());
    let c = list.active().nth(2).unwrap().id.clone();
    let order = list.move_task(&client, &c, 1).await.unwrap();
    assert_eq!(order, 1.5);
    assert_eq!(titles(&list), ["A", "C", "B"]);

    let server_view = TaskList::new(client.list_tasks().await.unwrap());
    assert_eq!(titles(&server_view), ["A", "C", "B"]);
    handle.abort();
}

#[tokio::test]
async fn stale_client_is_rejected_and_unchanged() {
    let (url, handle) = start(OrderingConfig::default()).await;
    let client = ApiClient::new(&url, "t-alice").unwrap();
    seed(&client, &["A", "B", "C", "D"]).await;

    let mut first = TaskList::new(client.list_tasks().await.unwrap());
    let mut second = first.clone();

    // First client drops D between A and B.
    let d = first.active().nth(3).unwrap().id.clone();
    first.move_task(&client, &d, 1).await.unwrap();

    // Second client still believes A and B are adjacent and drops C there.
    let c = second.active().nth(2).unwrap().id.clone();
    let before = second.tasks().to_vec();
    let err = second.move_task(&client, &c, 1).await.unwrap_err();
    assert!(matches!(err, TaskError::Remote(ref e) if e.is_conflict()));
    assert_eq!(second.tasks(), before.as_slice());

    second.refresh(&client).await.unwrap();
    assert_eq!(titles(&second), ["A", "D", "B", "C"]);
    handle.abort();
}

#[tokio::test]
async fn renormalized_move_reloads_list() {
    let (url, handle) = start(OrderingConfig {
        min_gap: 0.3,
        renormalize_spacing: 1000.0,
    })
    .await;
    let client = ApiClient::new(&url, "t-alice").unwrap();
    seed(&client, &["A", "B", "C"]).await;
    let mut list = TaskList::new(client.list_tasks().await.unwrap());

    let c = list.active().nth(2).unwrap().id.clone();
    let b = list.active().nth(1).unwrap().id.clone();
    list.move_task(&client, &c, 1).await.unwrap(); // A C B, C = 1.5
    list.move_task(&client, &b, 1).await.unwrap(); // A B C, B = 1.25
    let order = list.move_task(&client, &c, 1).await.unwrap(); // gap 0.25

    assert_eq!(order, 1500.0);
    assert_eq!(titles(&list), ["A", "C", "B"]);
    let orders: Vec<f64> = list.active().map(|t| t.order).collect();
    assert_eq!(orders, [1000.0, 1500.0, 2000.0]);
    handle.abort();
}

#[tokio::test]
async fn owners_are_isolated() {
    let (url, handle) = start(OrderingConfig::default()).await;
    let alice = ApiClient::new(&url, "t-alice").unwrap();
    let bob = ApiClient::new(&url, "t-bob").unwrap();
    seed(&alice, &["A1", "A2"]).await;
    seed(&bob, &["B1"]).await;

    assert_eq!(alice.list_tasks().await.unwrap().len(), 2);
    let bob_tasks = bob.list_tasks().await.unwrap();
    assert_eq!(bob_tasks.len(), 1);
    assert_eq!(bob_tasks[0].order, 1.0);

    let err = alice
        .update_task(&bob_tasks[0].id, &UpdateTaskRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("NOT_FOUND"));
    handle.abort();
}

#[tokio::test]
async fn bad_token_is_unauthenticated() {
    let (url, handle) = start(OrderingConfig::default()).await;
    let client = ApiClient::new(&url, "t-nobody").unwrap();
    let err = client.list_tasks().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    handle.abort();
}

#[tokio::test]
async fn crud_and_view_through_client() {
    let (url, handle) = start(OrderingConfig::default()).await;
    let client = ApiClient::new(&url, "t-alice").unwrap();

    let report = client
        .create_task(&CreateTaskRequest {
            priority: Some(Priority::High),
            ..CreateTaskRequest::titled("Write report")
        })
        .await
        .unwrap();
    let milk = client
        .create_task(&CreateTaskRequest::titled("Buy milk"))
        .await
        .unwrap();
    let old = client
        .create_task(&CreateTaskRequest::titled("Old errand"))
        .await
        .unwrap();

    client
        .update_task(
            &milk.id,
            &UpdateTaskRequest {
                status: Some(TaskStatus::Completed),
                ..UpdateTaskRequest::default()
            },
        )
        .await
        .unwrap();
    client.delete_task(&old.id).await.unwrap();

    let tasks = client.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 2);

    let store = MemoryPreferenceStore::new(ViewPreferences {
        sort: SortKey::Priority,
        ..ViewPreferences::default()
    });
    let view = store.load().unwrap();
    let shown = view.apply(&tasks);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].id, report.id);

    let renormalized = client.renormalize().await.unwrap();
    assert_eq!(renormalized.renormalized, 1);
    handle.abort();
}

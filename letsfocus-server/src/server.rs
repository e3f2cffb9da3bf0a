//! HTTP surface: shared state, router, and request handlers.
//!
//! Every `/api` route authenticates through [`AuthenticatedOwner`] and only
//! ever sees the caller's own tasks. Handlers are thin: parse, call the
//! store or [`reorder_task`], and map errors through [`ApiErrorResponse`].

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use letsfocus_proto::api::{
    CreateTaskRequest, MessageResponse, RenormalizeResponse, ReorderRequest, ReorderResponse,
    UpdateTaskRequest,
};
use letsfocus_proto::task::{Task, TaskId, TaskStatus, now_ms, validate_title};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthenticatedOwner, SessionRegistry};
use crate::config::OrderingConfig;
use crate::error::ApiErrorResponse;
use crate::reorder::reorder_task;
use crate::store::TaskStore;

/// State shared by all handlers.
pub struct AppState {
    /// Task table.
    pub store: TaskStore,
    /// Bearer token lookup.
    pub sessions: SessionRegistry,
    /// Fractional ordering thresholds.
    pub ordering: OrderingConfig,
}

impl AppState {
    /// Bundles the store and sessions with default ordering thresholds.
    #[must_use]
    pub fn new(store: TaskStore, sessions: SessionRegistry) -> Self {
        Self {
            store,
            sessions,
            ordering: OrderingConfig::default(),
        }
    }

    /// Replaces the ordering thresholds.
    #[must_use]
    pub const fn with_ordering(mut self, ordering: OrderingConfig) -> Self {
        self.ordering = ordering;
        self
    }
}

type ApiResult<T> = Result<T, ApiErrorResponse>;

/// Builds the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reorder", put(reorder))
        .route("/api/tasks/renormalize", post(renormalize))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the server with an empty in-memory store and no sessions.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let state = AppState::new(TaskStore::new(), SessionRegistry::new());
    start_server_with_state(addr, Arc::new(state)).await
}

/// Starts the server with a pre-built [`AppState`].
///
/// Binding to port 0 picks a free port; the returned address is the one
/// actually bound.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Json<Vec<Task>> {
    let tasks = state.store.list_visible(&owner).await;
    tracing::debug!(owner = %owner, count = tasks.len(), "listed tasks");
    Json(tasks)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = body.map_err(reject_body)?;
    validate_title(&req.title).map_err(ApiErrorResponse::invalid_request)?;

    let now = now_ms();
    let task = Task {
        id: TaskId::new(),
        owner: owner.clone(),
        title: req.title,
        description: req.description,
        status: TaskStatus::Todo,
        priority: req.priority.unwrap_or_default(),
        focus: req.focus.unwrap_or(false),
        tags: req.tags.unwrap_or_default(),
        group_id: req.group_id,
        due_date: req.due_date,
        order: 0.0,
        created_at: now,
        updated_at: now,
    };
    let task = state.store.create(task).await?;
    tracing::info!(owner = %owner, task = %task.id, order = task.order, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&raw_id)?;
    state
        .store
        .get(&owner, &id)
        .await
        .filter(|t| t.status != TaskStatus::Deleted)
        .map(Json)
        .ok_or_else(|| ApiErrorResponse::not_found(format!("task not found: {raw_id}")))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let id = parse_task_id(&raw_id)?;
    let Json(req) = body.map_err(reject_body)?;
    if let Some(title) = &req.title {
        validate_title(title).map_err(ApiErrorResponse::invalid_request)?;
    }

    let task = state
        .store
        .update(&owner, &id, |task| apply_update(task, req))
        .await?;
    tracing::debug!(owner = %owner, task = %task.id, status = %task.status, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_task_id(&raw_id)?;
    state
        .store
        .update(&owner, &id, |task| task.status = TaskStatus::Deleted)
        .await?;
    tracing::info!(owner = %owner, task = %id, "task deleted");
    Ok(Json(MessageResponse {
        message: "Task deleted".to_string(),
    }))
}

async fn reorder(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Json<ReorderResponse>> {
    let Json(req) = body.map_err(reject_body)?;
    let outcome = reorder_task(&state.store, &owner, &req, state.ordering).await?;
    Ok(Json(ReorderResponse {
        message: "Task reordered successfully".to_string(),
        order: outcome.task.order,
        renormalized: outcome.renormalized,
    }))
}

async fn renormalize(
    State(state): State<Arc<AppState>>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> ApiResult<Json<RenormalizeResponse>> {
    let count = state
        .store
        .renormalize(&owner, state.ordering.renormalize_spacing)
        .await?;
    tracing::info!(owner = %owner, count, "task list renormalized on request");
    Ok(Json(RenormalizeResponse {
        message: "Task order renormalized".to_string(),
        renormalized: count,
    }))
}

fn apply_update(task: &mut Task, req: UpdateTaskRequest) {
    if let Some(title) = req.title {
        task.title = title;
    }
    if let Some(description) = req.description {
        task.description = description;
    }
    if let Some(status) = req.status {
        task.status = status;
    }
    if let Some(priority) = req.priority {
        task.priority = priority;
    }
    if let Some(focus) = req.focus {
        task.focus = focus;
    }
    if let Some(tags) = req.tags {
        task.tags = tags;
    }
    if let Some(group_id) = req.group_id {
        task.group_id = group_id;
    }
    if let Some(due_date) = req.due_date {
        task.due_date = due_date;
    }
}

fn parse_task_id(raw: &str) -> ApiResult<TaskId> {
    TaskId::parse(raw).ok_or_else(|| ApiErrorResponse::not_found(format!("task not found: {raw}")))
}

fn reject_body(rejection: JsonRejection) -> ApiErrorResponse {
    tracing::debug!(error = %rejection, "rejected request body");
    ApiErrorResponse::invalid_request(rejection.body_text())
}

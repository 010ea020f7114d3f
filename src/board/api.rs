use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;

use super::models::{
    NewTask, NewUpgrade, ReorderUpdate, TaskPatch, TaskStatus, UpgradePatch, UpgradeStatus,
};
use super::store::StoreHandle;
use super::suggest::Suggester;
use super::tasks::DEFAULT_ACTIVITY_LIMIT;
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: StoreHandle,
    pub ws_tx: broadcast::Sender<String>,
    pub suggester: Suggester,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// `limit` stays raw so junk or `0` falls back to the default page.
#[derive(Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<String>,
}

impl ActivityQuery {
    pub fn page_size(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
    }
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub updates: Vec<ReorderUpdate>,
}

#[derive(Deserialize)]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
    pub index: usize,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::TaskNotFound { .. } | BoardError::UpgradeNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
            BoardError::Configuration(_)
            | BoardError::Capacity { .. }
            | BoardError::ExternalService(_)
            | BoardError::BadRequest(_) => ApiError::BadRequest(err.to_string()),
            BoardError::Storage { .. } | BoardError::LockPoisoned | BoardError::Other(_) => {
                tracing::error!(error = %err, "request failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        BoardError::BadRequest(rejection.body_text()).into()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        BoardError::BadRequest(rejection.body_text()).into()
    }
}

/// `Json` body extractor that rejects with a 400 `{error}` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor that rejects with a 400 `{error}` body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

fn parse_filter<T: FromStr<Err = String>>(raw: Option<String>) -> Result<Option<T>, ApiError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| T::from_str(&s))
        .transpose()
        .map_err(ApiError::BadRequest)
}

fn ok_body() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true}))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reorder", post(reorder_tasks))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/move", post(move_task))
        .route("/api/activity", get(list_activity))
        .route("/api/upgrades", get(list_upgrades).post(create_upgrade))
        .route("/api/upgrades/generate", post(generate_upgrades))
        .route("/api/upgrades/rerank", post(rerank_upgrades))
        .route(
            "/api/upgrades/{id}",
            get(get_upgrade).patch(update_upgrade).delete(delete_upgrade),
        )
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_tasks(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = parse_filter::<TaskStatus>(query.status)?;
    let tasks = state.store.call(move |s| s.tasks.list(status)).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<NewTask>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.store.call(move |s| s.tasks.create(req)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.store.call(move |s| s.tasks.get(&id)).await?;
    Ok(Json(task))
}

async fn update_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.store.call(move |s| s.tasks.update(&id, patch)).await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.call(move |s| s.tasks.delete(&id)).await?;
    Ok(ok_body())
}

async fn reorder_tasks(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .call(move |s| s.tasks.reorder(&req.updates))
        .await?;
    Ok(ok_body())
}

async fn move_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<MoveTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = state
        .store
        .call(move |s| s.tasks.move_to(&id, req.status, req.index))
        .await?;
    Ok(Json(plan))
}

async fn list_activity(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.page_size();
    let activity = state
        .store
        .call(move |s| s.tasks.list_activity(limit))
        .await?;
    Ok(Json(activity))
}

async fn list_upgrades(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = parse_filter::<UpgradeStatus>(query.status)?;
    let upgrades = state.store.call(move |s| s.upgrades.list(status)).await?;
    Ok(Json(upgrades))
}

async fn create_upgrade(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<NewUpgrade>,
) -> Result<impl IntoResponse, ApiError> {
    let upgrade = state.store.call(move |s| s.upgrades.create(req)).await?;
    Ok((StatusCode::CREATED, Json(upgrade)))
}

async fn get_upgrade(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let upgrade = state.store.call(move |s| s.upgrades.get(&id)).await?;
    Ok(Json(upgrade))
}

async fn update_upgrade(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<UpgradePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let upgrade = state
        .store
        .call(move |s| s.upgrades.update(&id, patch))
        .await?;
    Ok(Json(upgrade))
}

async fn delete_upgrade(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.call(move |s| s.upgrades.delete(&id)).await?;
    Ok(ok_body())
}

async fn generate_upgrades(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let created = state.suggester.generate(&state.store).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn rerank_upgrades(State(state): State<SharedState>) -> impl IntoResponse {
    state.suggester.rerank(&state.store).await;
    ok_body()
}

// ── Tests ─────────────────────────────────────────────────────────────

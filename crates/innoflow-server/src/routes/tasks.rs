use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use innoflow_core::task::TaskDetails;
use innoflow_core::user::CurrentUser;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/{id}/details", get(task_details))
        .route("/api/tasks/{id}/claim", post(claim))
        .route("/api/tasks/{id}/unclaim", post(unclaim))
        .route("/api/tasks/{id}/complete", post(complete))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListQuery {
    idea_name: Option<String>,
    task_definition_key: Option<String>,
}

async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<TaskListQuery>,
) -> Json<Vec<TaskDetails>> {
    Json(state.store().tasks_for(
        &user,
        q.idea_name.as_deref(),
        q.task_definition_key.as_deref(),
    ))
}

async fn task_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskDetails>, ApiError> {
    state.store().task(&id).map(Json).map_err(to_error)
}

async fn claim(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store().claim(&id, &user.username).map_err(to_error)?;
    tracing::info!(task = %id, by = %user.username, "claimed");
    Ok(StatusCode::NO_CONTENT)
}

async fn unclaim(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store().unclaim(&id, &user.username).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(variables): Json<Map<String, Value>>,
) -> Result<StatusCode, ApiError> {
    state
        .store()
        .complete(&id, &user.username, variables)
        .map_err(to_error)?;
    tracing::info!(task = %id, by = %user.username, "completed");
    Ok(StatusCode::NO_CONTENT)
}

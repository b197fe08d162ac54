use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use innoflow_core::user::{TeamAssignment, User};

use super::{to_error, ApiError, AppState};
use crate::store::GROUP_DEV;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/developpements/users", get(dev_users))
        .route(
            "/api/developpements/process-instances/{id}/equipe",
            post(assign_team),
        )
}

async fn dev_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.store().users_in_group(GROUP_DEV))
}

async fn assign_team(
    State(state): State<AppState>,
    Path(process_instance_id): Path<String>,
    Json(team): Json<TeamAssignment>,
) -> Result<StatusCode, ApiError> {
    state
        .store()
        .set_team(&process_instance_id, &team)
        .map_err(to_error)?;
    Ok(StatusCode::OK)
}

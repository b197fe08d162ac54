use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use innoflow_core::idea::{Idea, IdeaInput, Priority};
use innoflow_core::task::FullIdeaDetails;
use innoflow_core::user::CurrentUser;
use serde::Deserialize;

use super::{error, require, to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ideas", get(list_ideas).post(create_idea))
        .route(
            "/api/ideas/{id}",
            get(get_idea).put(update_idea).delete(delete_idea),
        )
        .route("/api/ideas/{id}/prioritize", post(prioritize))
}

/// Query parameters are accepted and ignored; callers filter locally.
async fn list_ideas(State(state): State<AppState>) -> Json<Vec<Idea>> {
    Json(state.store().ideas())
}

async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FullIdeaDetails>, ApiError> {
    state.store().idea(id).map(Json).map_err(to_error)
}

async fn create_idea(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<IdeaInput>,
) -> Result<(StatusCode, Json<Idea>), ApiError> {
    require(user.can_manage_ideas())?;
    let idea = state
        .store()
        .create_idea(&input, &user.username)
        .map_err(to_error)?;
    tracing::info!(id = idea.id, by = %user.username, "idea submitted");
    Ok((StatusCode::CREATED, Json(idea)))
}

async fn update_idea(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(input): Json<IdeaInput>,
) -> Result<Json<Idea>, ApiError> {
    require(user.can_manage_ideas())?;
    state.store().update_idea(id, &input).map(Json).map_err(to_error)
}

async fn delete_idea(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require(user.can_manage_ideas())?;
    state.store().delete_idea(id).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PrioritizeRequest {
    priority: String,
}

/// The path segment is the process instance id, not the idea id.
async fn prioritize(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(process_instance_id): Path<String>,
    Json(req): Json<PrioritizeRequest>,
) -> Result<Json<Idea>, ApiError> {
    let priority = Priority::from_str(&req.priority)
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, format!("unknown priority {}", req.priority)))?;
    state
        .store()
        .prioritize(&process_instance_id, priority, &user.username)
        .map(Json)
        .map_err(to_error)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::test_helpers::{login_token, test_router};

    async fn post(app: Router, token: &str, uri: &str, body: Value) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Authorization", format!("Bearer {token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn only_submitters_create_ideas() {
        let (app, state) = test_router();
        let body = json!({ "titre": "Kiosks", "description": "d" });

        let quentin = login_token(&state, "quentin");
        assert_eq!(
            post(app.clone(), &quentin, "/api/ideas", body.clone()).await,
            StatusCode::FORBIDDEN
        );

        let emma = login_token(&state, "emma");
        assert_eq!(post(app, &emma, "/api/ideas", body).await, StatusCode::CREATED);
        assert_eq!(state.store().ideas().len(), 1);
    }

    #[tokio::test]
    async fn prioritize_rejects_unknown_priority() {
        let (app, state) = test_router();
        let token = login_token(&state, "ines");
        let status = post(
            app,
            &token,
            "/api/ideas/some-pid/prioritize",
            json!({ "priority": "URGENT" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

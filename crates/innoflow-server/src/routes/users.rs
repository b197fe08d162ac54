use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use innoflow_core::user::{CurrentUser, Group, User, UserInput};

use super::{require_admin, to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/groups", get(list_groups))
        .route("/api/users/{id}", put(update_user).delete(delete_user))
        .route("/api/users/{id}/groups", get(user_groups).post(set_groups))
}

async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    require_admin(&user)?;
    Ok(Json(state.store().users()))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require_admin(&user)?;
    let created = state.store().create_user(&input).map_err(to_error)?;
    tracing::info!(id = %created.id, "user created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(input): Json<UserInput>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    state.store().update_user(&id, &input).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    state.store().delete_user(&id).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Group>>, ApiError> {
    require_admin(&user)?;
    Ok(Json(state.store().groups()))
}

async fn user_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Group>>, ApiError> {
    require_admin(&user)?;
    state.store().groups_of(&id).map(Json).map_err(to_error)
}

/// Replaces the user's memberships with exactly the given group ids.
async fn set_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(group_ids): Json<Vec<String>>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    state.store().set_groups(&id, &group_ids).map_err(to_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::test_helpers::{login_token, test_router};

    #[tokio::test]
    async fn user_admin_is_admin_only() {
        let (app, state) = test_router();
        for (who, expected) in [("emma", StatusCode::FORBIDDEN), ("admin", StatusCode::OK)] {
            let token = login_token(&state, who);
            let resp = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri("/api/users/groups")
                        .header("Authorization", format!("Bearer {token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), expected, "{who}");
        }
    }
}

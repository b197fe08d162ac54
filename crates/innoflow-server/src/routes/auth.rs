use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use innoflow_core::user::CurrentUser;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error, ApiError, AppState};
use crate::auth::generate_token;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/api/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.store();
    if !store.check_password(&req.username, &req.password) {
        tracing::info!(username = %req.username, "login rejected");
        return Err(error(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    let token = generate_token();
    store.open_session(token.clone(), &req.username);
    tracing::info!(username = %req.username, "login");
    Ok(Json(json!({ "token": token })))
}

async fn me(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}

pub mod auth;
pub mod dashboard;
pub mod developpements;
pub mod documents;
pub mod ideas;
pub mod tasks;
pub mod users;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{http::StatusCode, middleware, Json, Router};
use innoflow_core::user::CurrentUser;
use serde_json::{json, Value};

use crate::auth::auth_middleware;
use crate::store::{Store, StoreError};

pub struct InnerAppState {
    store: Mutex<Store>,
}

impl InnerAppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// A panicking handler must not take the whole fixture down with it.
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub type AppState = Arc<InnerAppState>;

pub type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState) -> Router {
    let public = Router::new().merge(auth::routes());

    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(ideas::routes())
        .merge(tasks::routes())
        .merge(documents::routes())
        .merge(dashboard::routes())
        .merge(users::routes())
        .merge(developpements::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    public.merge(protected).with_state(state)
}

pub(crate) fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

/// Engine refusals surface as 500, the way the workflow engine reports
/// a claim on a task someone else already holds.
pub(crate) fn to_error(e: StoreError) -> ApiError {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        StoreError::Rejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
    };
    error(status, e.to_string())
}

pub(crate) fn require(allowed: bool) -> Result<(), ApiError> {
    if allowed {
        Ok(())
    } else {
        Err(error(StatusCode::FORBIDDEN, "insufficient permissions"))
    }
}

pub(crate) fn require_admin(user: &CurrentUser) -> Result<(), ApiError> {
    require(user.is_admin())
}

use axum::{extract::State, routing::get, Json, Router};
use innoflow_core::dashboard::DashboardStats;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

async fn stats(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.store().dashboard())
}

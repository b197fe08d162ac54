//! In-memory stand-in for the innovation workflow backend. It speaks the
//! same REST contract as the real service, so the client can be run and
//! tested end to end without the process engine.

pub mod auth;
mod routes;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use routes::{build_router, AppState, InnerAppState};
use store::Store;

pub fn app_state(store: Store) -> AppState {
    Arc::new(InnerAppState::new(store))
}

pub async fn serve(listener: TcpListener, store: Store) -> Result<()> {
    let app = build_router(app_state(store)).layer(TraceLayer::new_for_http());
    axum::serve(listener, app).await?;
    Ok(())
}

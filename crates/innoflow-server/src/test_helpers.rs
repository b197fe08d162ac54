use axum::Router;
use tokio::net::TcpListener;

use crate::auth::generate_token;
use crate::store::Store;
use crate::{app_state, build_router, AppState};

/// Router over the demo accounts, plus its state for seeding.
pub fn test_router() -> (Router, AppState) {
    let state = app_state(Store::with_demo_data());
    (build_router(state.clone()), state)
}

/// Open a session for `username` without going through the login route.
pub fn login_token(state: &AppState, username: &str) -> String {
    let token = generate_token();
    state.store().open_session(token.clone(), username);
    token
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn the fixture on a random port, seeded with the demo accounts.
pub async fn spawn_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");
    let (app, state) = test_router();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        state,
        _handle: handle,
    }
}

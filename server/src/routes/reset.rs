//! Administrative reset endpoint.

use axum::{extract::State, routing::any, Router};

use crate::AppState;

/// Path that resets every registered rule.
pub const RESET_PATH: &str = "/_reset";

/// Create reset routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(RESET_PATH, any(reset))
}

/// Any method on /_reset - restore every rule to its registered collection.
async fn reset(State(state): State<AppState>) -> &'static str {
    state.registry.reset_all();
    "Reset successful"
}

//! HTTP route definitions.

mod reset;
pub mod resource;

use crate::AppState;
use axum::Router;

/// Create all application routes.
///
/// `/_reset` is routed explicitly; every other request goes to the resource
/// dispatcher.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(reset::routes())
        .fallback(resource::dispatch)
}

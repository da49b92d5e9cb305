//! Mockrest Server - a mock REST test server.
//!
//! Resources are registered on a [`Mocks`] builder, either in code or from
//! JSON fixture files, and served by an axum router. Each resource answers
//! the standard REST verbs on its path and on `<path>/<id>`; `/_reset`
//! restores every resource to its registered collection.
//!
//! ```no_run
//! use mockrest_server::{app, Config, Mocks};
//! use mockrest_engine::RuleOptions;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut mocks = Mocks::new();
//! mocks.add_resource(
//!     "/api/users",
//!     vec![json!({"id": 1, "name": "Alice"})],
//!     RuleOptions::new(),
//! )?;
//!
//! let config = Config::default();
//! let listener = tokio::net::TcpListener::bind(config.addr()).await?;
//! axum::serve(listener, app(mocks, &config)).await?;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod middleware;
pub mod path;
pub mod registry;
pub mod routes;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use fixtures::{register_fixture, FixtureError};
pub use registry::{Mocks, Registry, RegistrationError};

use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Build the router serving the registered resources.
pub fn app(mocks: Mocks, config: &Config) -> Router {
    let state = AppState {
        registry: Arc::new(mocks.into_registry()),
    };

    Router::new()
        .merge(routes::create_routes())
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::cors))
        .with_state(state)
}

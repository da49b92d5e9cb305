//! CORS middleware.
//!
//! `tower_http::cors` answers every OPTIONS request as a preflight. Only
//! requests carrying both `Origin` and `Access-Control-Request-Method` are
//! preflights here; a bare OPTIONS reaches the dispatcher like any other
//! unmapped method.

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use tower::{Layer, ServiceExt};
use tower_http::cors::{Any, CorsLayer};

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Whether the request is a CORS preflight.
pub fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(header::ORIGIN)
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Apply permissive CORS, except to OPTIONS requests that are not preflights.
pub async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS && !is_preflight(&request) {
        return next.run(request).await;
    }

    match cors_layer().layer(next).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

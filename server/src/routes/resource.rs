//! Resource dispatcher - maps requests onto rule operations.

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::Response,
};
use mockrest_engine::{
    record::is_truthy, Operation, Params, RequestMeta, Response as RuleResponse, ID_PARAM,
};
use serde_json::Value;

use crate::body::read_body;
use crate::error::{AppError, Result};
use crate::path::{params_from_pairs, PathMatch};
use crate::AppState;

/// Content type used unless a rule response overrides it.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Fallback handler: find the first matching rule and run the operation the
/// method selects.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Response> {
    let Some((entry, matched)) = state.registry.find(uri.path()) else {
        tracing::debug!(%method, %uri, "No handler, falling through");
        return Err(AppError::NoRoute {
            method,
            path: uri.path().to_string(),
        });
    };

    tracing::info!("{} {}", method, uri);
    tracing::debug!(pattern = %entry.pattern(), "...matches pattern");

    let params = request_params(&matched, query);
    tracing::debug!(?params, "...parsed params");

    let has_id = params.get(ID_PARAM).is_some_and(is_truthy);
    let op = Operation::resolve(method.as_str(), has_id).ok_or(AppError::MethodNotAllowed)?;

    let data = if op.reads_body() {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        read_body(content_type, &body)?
    } else {
        Value::Null
    };

    let meta = request_meta(&method, &uri, &headers);
    let response = entry.lock().call(op, &params, data, &meta);
    tracing::debug!(%op, ?response, "...returning response");

    Ok(into_http_response(response, method == Method::HEAD))
}

/// Path parameters, then the id, then query parameters, later ones winning.
fn request_params(matched: &PathMatch, query: Vec<(String, String)>) -> Params {
    let mut params = Params::new();
    for (name, value) in &matched.params {
        params.insert(name.clone(), Value::String(value.clone()));
    }
    if let Some(id) = &matched.id {
        params.insert(ID_PARAM.to_string(), Value::String(id.clone()));
    }
    params.extend(params_from_pairs(query));
    params
}

fn request_meta(method: &Method, uri: &Uri, headers: &HeaderMap) -> RequestMeta {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name, value)))
        .fold(
            RequestMeta::new(method.as_str(), uri.to_string()),
            |meta, (name, value)| meta.with_header(name.as_str(), value),
        )
}

/// Serialize a rule response.
///
/// Strings are written as-is and other truthy values as JSON; falsy data
/// gives an empty body. HEAD responses never carry a body.
pub fn into_http_response(response: RuleResponse, head: bool) -> Response {
    let body = match &response.data {
        _ if head => Body::empty(),
        Some(data) if !is_truthy(data) => Body::empty(),
        Some(Value::String(text)) => Body::from(text.clone()),
        Some(data) => Body::from(data.to_string()),
        None => Body::empty(),
    };

    let mut http = Response::new(body);
    *http.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = http.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
    );
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid response header"),
        }
    }

    http
}

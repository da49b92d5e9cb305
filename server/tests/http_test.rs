//! HTTP tests for the mock server.
//!
//! Requests are driven through the router in-process with `oneshot`, except
//! for the final round trip which goes over a real socket.

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use mockrest_engine::{Params, Response as RuleResponse, RuleOptions};
use mockrest_server::{app, Config, Mocks};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const TEMPLATE: &str = "/foo/:fooId/bar";
const PATH: &str = "/foo/fooIdValue/bar";

fn collection() -> Vec<Value> {
    vec![
        json!({"id": 42, "foo": 1, "bar": 2}),
        json!({"id": 49, "foo": 5, "bar": 6}),
        json!({"id": 77, "foo": 3, "bar": 4}),
    ]
}

fn create_app(options: RuleOptions) -> Router {
    let mut mocks = Mocks::new();
    mocks.add_resource(TEMPLATE, collection(), options).unwrap();
    app(mocks, &Config::default())
}

/// Build an app whose rule is customized before serving.
fn create_app_with(customize: impl FnOnce(&mut mockrest_engine::ResourceRule)) -> Router {
    let mut mocks = Mocks::new();
    let rule = mocks
        .add_resource(TEMPLATE, collection(), RuleOptions::new())
        .unwrap();
    customize(rule);
    app(mocks, &Config::default())
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn request(app: &Router, method: Method, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn request_json(app: &Router, method: Method, uri: &str, body: Value) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Handler override that records the parameters it was called with.
fn capture_params() -> (Arc<Mutex<Option<Params>>>, impl FnOnce(&mut mockrest_engine::ResourceRule)) {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let customize = move |rule: &mut mockrest_engine::ResourceRule| {
        rule.set_handler(move |params, _, _| {
            *sink.lock().unwrap() = Some(params.clone());
            RuleResponse::new(200, None)
        });
    };
    (seen, customize)
}

// ============================================================================
// GET /path
// ============================================================================

#[tokio::test]
async fn get_collection_returns_envelope() {
    let app = create_app(RuleOptions::new());
    let res = request(&app, Method::GET, PATH).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), "application/json");
    assert_eq!(res.json(), json!({"items": collection(), "total": 3}));
}

#[tokio::test]
async fn get_collection_with_trailing_slash_and_paging() {
    let app = create_app(RuleOptions::new());
    let res = request(&app, Method::GET, &format!("{PATH}/?offset=1&limit=1")).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json(),
        json!({"items": [{"id": 49, "foo": 5, "bar": 6}], "total": 3})
    );
}

#[tokio::test]
async fn custom_envelope_keys() {
    let app = create_app(RuleOptions::new().with_collection_key("foo").with_count_key("bar"));
    let res = request(&app, Method::GET, PATH).await;
    assert_eq!(res.json(), json!({"foo": collection(), "bar": 3}));
}

#[tokio::test]
async fn query_filters_search_and_sort() {
    let app = create_app(RuleOptions::new());

    let res = request(&app, Method::GET, &format!("{PATH}?foo=5")).await;
    assert_eq!(res.json()["total"], 1);

    let res = request(&app, Method::GET, &format!("{PATH}?q=77")).await;
    assert_eq!(res.json()["items"][0]["id"], 77);

    let res = request(&app, Method::GET, &format!("{PATH}?sortBy=foo&sortDir=desc")).await;
    let ids: Vec<i64> = res.json()["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![49, 77, 42]);
}

#[tokio::test]
async fn path_params_reach_the_rule_but_do_not_filter() {
    let (seen, customize) = capture_params();
    let app = create_app_with(customize);
    request(&app, Method::GET, PATH).await;
    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(params.get("fooId"), Some(&json!("fooIdValue")));

    // without a handler the path parameter is not an equality filter
    let app = create_app(RuleOptions::new());
    let res = request(&app, Method::GET, PATH).await;
    assert_eq!(res.json()["total"], 3);
}

#[tokio::test]
async fn postfilter_headers_are_sent() {
    let app = create_app_with(|rule| {
        rule.set_postfilter(|_, response, _| {
            response
                .with_header("Content-Type", "text/plain")
                .with_header("Content-Disposition", "attachment; filename=example.txt")
        });
    });
    let res = request(&app, Method::GET, PATH).await;

    assert_eq!(res.content_type(), "text/plain");
    assert_eq!(
        res.headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=example.txt"
    );
}

#[tokio::test]
async fn query_string_is_decoded() {
    let (seen, customize) = capture_params();
    let app = create_app_with(customize);
    request(
        &app,
        Method::GET,
        &format!("{PATH}?q=hello+world&tag=a&tag=b&flag&x=%2F"),
    )
    .await;
    let params = seen.lock().unwrap().clone().unwrap();
    assert_eq!(
        Value::Object(params),
        json!({
            "fooId": "fooIdValue",
            "q": "hello world",
            "tag": ["a", "b"],
            "flag": "",
            "x": "/"
        })
    );
}

// ============================================================================
// HEAD
// ============================================================================

#[tokio::test]
async fn head_has_no_body() {
    let app = create_app(RuleOptions::new());

    let res = request(&app, Method::HEAD, PATH).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), "application/json");
    assert!(res.body.is_empty());

    let res = request(&app, Method::HEAD, &format!("{PATH}/42")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());

    let res = request(&app, Method::HEAD, &format!("{PATH}/nonexistent")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Item routes
// ============================================================================

#[tokio::test]
async fn get_item() {
    let app = create_app(RuleOptions::new());

    let res = request(&app, Method::GET, &format!("{PATH}/42/")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"id": 42, "foo": 1, "bar": 2}));

    let res = request(&app, Method::GET, &format!("{PATH}/nonexistent")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn id_in_query_selects_item() {
    let app = create_app(RuleOptions::new());
    let res = request(&app, Method::GET, &format!("{PATH}?id=49")).await;
    assert_eq!(res.json(), json!({"id": 49, "foo": 5, "bar": 6}));
}

#[tokio::test]
async fn post_adds_item() {
    let app = create_app(RuleOptions::new());
    let item = json!({"id": 1, "foo": 2, "bar": 3});

    let res = request_json(&app, Method::POST, &format!("{PATH}/"), item.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), "application/json");
    assert_eq!(res.json(), item);

    let res = request(&app, Method::GET, &format!("{PATH}/1")).await;
    assert_eq!(res.json(), item);
}

#[tokio::test]
async fn put_replaces() {
    let app = create_app(RuleOptions::new());

    let replacement = json!({"id": 42, "foo": 999});
    let res = request_json(&app, Method::PUT, &format!("{PATH}/42"), replacement.clone()).await;
    assert_eq!(res.json(), replacement);

    let res = request_json(&app, Method::PUT, &format!("{PATH}/nonexistent"), json!({})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let mut new_collection = collection();
    new_collection[0]["foo"] = json!(999);
    let res = request_json(&app, Method::PUT, PATH, json!(new_collection)).await;
    assert_eq!(res.json(), json!({"items": new_collection, "total": 3}));
}

#[tokio::test]
async fn patch_extends() {
    let app = create_app(RuleOptions::new());

    let res = request_json(&app, Method::PATCH, &format!("{PATH}/42"), json!({"foo": 999})).await;
    assert_eq!(res.json(), json!({"id": 42, "foo": 999, "bar": 2}));

    let res = request_json(
        &app,
        Method::PATCH,
        PATH,
        json!([{"id": 42, "foo": 7}, {"id": 49, "baz": "new prop"}]),
    )
    .await;
    assert_eq!(
        res.json(),
        json!([
            {"id": 42, "foo": 7, "bar": 2},
            {"id": 49, "foo": 5, "bar": 6, "baz": "new prop"}
        ])
    );
}

#[tokio::test]
async fn delete_item_and_collection() {
    let app = create_app(RuleOptions::new());

    let res = request(&app, Method::DELETE, &format!("{PATH}/42")).await;
    assert_eq!(res.json(), json!({"id": 42, "foo": 1, "bar": 2}));
    let res = request(&app, Method::GET, &format!("{PATH}/42")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = request(&app, Method::DELETE, &format!("{PATH}/42")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = request(&app, Method::DELETE, &format!("{PATH}/")).await;
    assert_eq!(res.json(), json!({"items": [], "total": 0}));
}

// ============================================================================
// Transport errors
// ============================================================================

#[tokio::test]
async fn unsupported_method_is_405() {
    let app = create_app(RuleOptions::new());
    for method in [Method::TRACE, Method::OPTIONS] {
        let res = request(&app, method.clone(), PATH).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert!(res.body.is_empty());
    }

    let res = request(&app, Method::OPTIONS, "/nothing/here").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, "Cannot OPTIONS /nothing/here");
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = create_app(RuleOptions::new());
    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri(PATH)
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();
    let res = send(&app, preflight).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let cross_origin = Request::builder()
        .uri(PATH)
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let res = send(&app, cross_origin).await;
    assert_eq!(res.json()["total"], 3);
    assert_eq!(
        res.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn body_content_types() {
    let app = create_app(RuleOptions::new());

    let res = request_json(&app, Method::POST, PATH, json!({"foobar": "42"})).await;
    assert_eq!(res.status, StatusCode::OK);

    let form = Request::builder()
        .method(Method::POST)
        .uri(PATH)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("foobar=42"))
        .unwrap();
    let res = send(&app, form).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"foobar": "42"}));

    let other = Request::builder()
        .method(Method::POST)
        .uri(PATH)
        .header(header::CONTENT_TYPE, "application/x-foobar")
        .body(Body::from("foobar"))
        .unwrap();
    let res = send(&app, other).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.content_type(), "text/plain");
    assert!(res.body.starts_with("Invalid request. "));

    let res = request_json(&app, Method::GET, PATH, json!({})).await;
    assert_eq!(res.json()["total"], 5);
}

#[tokio::test]
async fn unmatched_paths_fall_through() {
    let app = create_app(RuleOptions::new());
    let res = request(&app, Method::GET, "/nothing/here").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, "Cannot GET /nothing/here");
}

// ============================================================================
// Reset and fingerprinting
// ============================================================================

#[tokio::test]
async fn reset_restores_collections() {
    let app = create_app(RuleOptions::new());
    request(&app, Method::DELETE, PATH).await;
    assert_eq!(request(&app, Method::GET, PATH).await.json()["total"], 0);

    let res = request(&app, Method::POST, "/_reset").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "Reset successful");

    let res = request(&app, Method::GET, PATH).await;
    assert_eq!(res.json(), json!({"items": collection(), "total": 3}));
}

#[tokio::test]
async fn fingerprinted_clients_do_not_share_state() {
    let app = create_app(RuleOptions {
        fingerprinting: true,
        ..RuleOptions::default()
    });

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(PATH)
        .header(header::USER_AGENT, "browser-a")
        .body(Body::empty())
        .unwrap();
    send(&app, delete).await;

    let as_a = Request::builder()
        .uri(PATH)
        .header(header::USER_AGENT, "browser-a")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, as_a).await.json()["total"], 0);

    let as_b = Request::builder()
        .uri(PATH)
        .header(header::USER_AGENT, "browser-b")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, as_b).await.json()["total"], 3);
}

// ============================================================================
// Over the wire
// ============================================================================

#[tokio::test]
async fn serves_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(RuleOptions::new());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let base = format!("http://{addr}{PATH}");

    let created: Value = client
        .post(&base)
        .json(&json!({"id": 100, "foo": "wire"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created, json!({"id": 100, "foo": "wire"}));

    let listed: Value = client
        .get(format!("{base}?foo=wire"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed, json!({"items": [{"id": 100, "foo": "wire"}], "total": 1}));
}

// ============================================================================
// Fixtures
// ============================================================================

#[tokio::test]
async fn serves_bundled_fixture() {
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/users.json");
    let mut mocks = Mocks::new();
    let added = mockrest_server::register_fixture(&mut mocks, &fixture).unwrap();
    assert_eq!(added, 2);
    let app = app(mocks, &Config::default());

    let res = request(&app, Method::GET, "/api/users?role=editor&per_page=1").await;
    assert_eq!(
        res.json(),
        json!({"items": [{"userId": 2, "name": "Bob", "role": "editor"}], "total": 2})
    );

    let res = request(&app, Method::GET, "/api/users/2").await;
    assert_eq!(res.json()["name"], "Bob");

    let res = request(&app, Method::GET, "/api/users/1/posts/p2").await;
    assert_eq!(res.json(), json!({"id": "p2", "title": "Second post"}));

    let res = request(&app, Method::GET, "/api/users/1/posts").await;
    assert_eq!(res.json()["count"], 2);
}

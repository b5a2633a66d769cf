//! Router tests: the full Axum app driven with `oneshot` against a mock
//! KVDB backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kvdbw_client::{BackendConfig, Credential, KvdbClient, TrustStore};
use kvdbw_server::config::PrometheusConfig;
use kvdbw_server::routes;
use kvdbw_server::state::AppState;

fn state_for(port: u16) -> Arc<AppState> {
    let config = BackendConfig {
        host: "127.0.0.1".to_owned(),
        port,
        protocol: "http".to_owned(),
        timeout: Duration::from_secs(5),
        ..BackendConfig::default()
    };
    let client =
        KvdbClient::with_trust_store(&config, Credential::new("pw"), &TrustStore::empty())
            .expect("client should build");
    Arc::new(AppState::new(client, true))
}

fn app_with(state: Arc<AppState>) -> Router {
    routes::app(state, &PrometheusConfig::default())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_owned()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn mount_key_list(server: &MockServer, namespace: &str, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/{namespace}/*")))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

/// A port nothing listens on.
fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ── Dispatch ─────────────────────────────────────────────────────────

#[tokio::test]
async fn root_redirects_to_default_version() {
    let server = MockServer::start().await;
    let app = app_with(state_for(server.address().port()));

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/v1");
}

#[tokio::test]
async fn unknown_version_is_not_found() {
    let server = MockServer::start().await;
    let app = app_with(state_for(server.address().port()));

    let response = app.oneshot(get("/v2/ns1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 Not Found");
}

#[tokio::test]
async fn version_root_lists_namespaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "ns1", "size": 2, "access": true},
            {"name": "kvdb", "size": 1, "access": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with(state_for(server.address().port()));
    let response = app.oneshot(get("/v1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );

    let html = body_text(response).await;
    assert!(html.contains("href=\"/v1/ns1\""));
    assert!(html.contains("href=\"/v1/kvdb\""));
}

#[tokio::test]
async fn reserved_counter_renders_read_only() {
    let server = MockServer::start().await;
    mount_key_list(
        &server,
        "kvdb",
        json!([{"key": "counter", "value": "7"}, {"key": "other", "value": "a\nb"}]),
    )
    .await;

    let app = app_with(state_for(server.address().port()));
    let html = body_text(app.oneshot(get("/v1/kvdb")).await.unwrap()).await;

    assert!(html.contains("<tr data-key=\"counter\" data-read-only=\"true\">"));
    assert!(html.contains("<tr data-key=\"other\">"));
    assert!(html.contains("rows=\"2\""));
    assert_eq!(html.matches("value=\"Delete\"").count(), 1);
}

#[tokio::test]
async fn extra_path_segments_share_namespace_counter() {
    let server = MockServer::start().await;
    mount_key_list(&server, "ns1", json!([])).await;

    let state = state_for(server.address().port());
    for uri in ["/v1/ns1", "/v1/ns1/a", "/v1/ns1/b/c"] {
        let response = app_with(Arc::clone(&state)).oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.metrics.get("/v1/ns1", "GET", ""), 3);
    assert_eq!(state.metrics.get("/v1/ns1/a", "GET", ""), 0);
}

// ── Mutations ────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_then_list() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/ns1/foo"))
        .respond_with(ResponseTemplate::new(200).set_body_string("200 OK"))
        .expect(1)
        .mount(&server)
        .await;
    mount_key_list(&server, "ns1", json!([{"key": "bar", "value": "x"}])).await;

    let state = state_for(server.address().port());
    let app = app_with(Arc::clone(&state));
    let response = app
        .oneshot(post_form("/v1/ns1", "input=Delete&key=foo"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("data-key=\"bar\""));
    assert!(!html.contains("data-key=\"foo\""));
    assert_eq!(state.metrics.get("/v1/ns1", "POST", "Delete"), 1);
}

#[tokio::test]
async fn create_posts_value_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/ns1/k1"))
        .and(body_json(json!({"type": "string", "value": "line1\nline2"})))
        .respond_with(ResponseTemplate::new(201).set_body_string("201 Created"))
        .expect(1)
        .mount(&server)
        .await;
    mount_key_list(&server, "ns1", json!([{"key": "k1", "value": "line1\nline2"}])).await;

    let app = app_with(state_for(server.address().port()));
    let response = app
        .oneshot(post_form("/v1/ns1", "input=Create&key=k1&value=line1%0Aline2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_action_makes_no_backend_call() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_string("200 OK"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("201 Created"))
        .expect(0)
        .mount(&server)
        .await;
    mount_key_list(&server, "ns1", json!([])).await;

    let state = state_for(server.address().port());
    let app = app_with(Arc::clone(&state));
    let response = app
        .oneshot(post_form("/v1/ns1", "input=Bogus&key=foo"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.metrics.get("/v1/ns1", "POST", "Bogus"), 1);
}

#[tokio::test]
async fn failed_mutation_skips_listing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/ns1/foo"))
        .respond_with(ResponseTemplate::new(404).set_body_string("404 Not Found"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_with(state_for(server.address().port()));
    let response = app
        .oneshot(post_form("/v1/ns1", "input=Delete&key=foo"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/html"
    );
    assert_eq!(body_text(response).await, "400 Bad Request");
}

#[tokio::test]
async fn listing_failure_is_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ns1/*"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let app = app_with(state_for(server.address().port()));
    let response = app.oneshot(get("/v1/ns1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_form_field_is_bad_request() {
    let server = MockServer::start().await;
    let app = app_with(state_for(server.address().port()));

    let response = app
        .oneshot(post_form("/v1/ns1", "input=Create&input=Delete&key=foo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn namespace_roll_addresses_whole_namespace() {
    let server = MockServer::start().await;
    Mock::given(method("UPDATE"))
        .and(path("/v1/ns1/"))
        .and(body_json(json!({"type": "roll"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"key": "", "value": ""})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "ns1"}])))
        .mount(&server)
        .await;

    let app = app_with(state_for(server.address().port()));
    let response = app
        .oneshot(post_form("/v1", "input=Roll&key=ns1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn namespace_create_posts_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1"))
        .and(body_json(json!({"name": "fresh"})))
        .respond_with(ResponseTemplate::new(201).set_body_string("201 Created"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "fresh"}])))
        .mount(&server)
        .await;

    let app = app_with(state_for(server.address().port()));
    let response = app
        .oneshot(post_form("/v1/", "input=Create&key=fresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("href=\"/v1/fresh\""));
}

// ── Health and metrics ───────────────────────────────────────────────

#[tokio::test]
async fn health_reports_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/system/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "UP"})))
        .mount(&server)
        .await;

    let state = state_for(server.address().port());
    let app = app_with(Arc::clone(&state));
    let response = app.oneshot(get("/system/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"status": "UP"}));
    assert_eq!(state.metrics.get("/system/health", "GET", ""), 1);
}

#[tokio::test]
async fn health_reports_down_when_backend_unreachable() {
    let app = app_with(state_for(dead_port()));
    let response = app.oneshot(get("/system/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({"status": "DOWN"}));
}

#[tokio::test]
async fn metrics_endpoint_exposes_counters() {
    let server = MockServer::start().await;
    let state = state_for(server.address().port());
    state.metrics.increment("/v1/ns1", "POST", "Delete");

    let app = app_with(Arc::clone(&state));
    let response = app.oneshot(get("/system/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let text = body_text(response).await;
    assert!(text.contains(
        r#"kvdbw_http_endpoint_requests_count{endpoint="/v1/ns1",method="POST",type="Delete"} 1"#
    ));
    assert!(text.contains("kvdbw_info{version="));
}

#[tokio::test]
async fn metrics_disabled_falls_through_to_controller() {
    let server = MockServer::start().await;
    let prometheus = PrometheusConfig {
        enabled: false,
        ..PrometheusConfig::default()
    };
    let app = routes::app(state_for(server.address().port()), &prometheus);

    let response = app.oneshot(get("/system/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Integration tests for the dash-feed HTTP API
//!
//! Every source is disabled, so the router serves cached or seed data and
//! nothing touches the network.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use dash_common::config::{SourceOverride, TomlConfig};
use dash_common::{CacheStore, EventBus};
use dash_feed::dashboard::SOURCE_KEYS;
use dash_feed::{build_router, AppState, Dashboard};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: dashboard with all sources disabled
fn disabled_dashboard() -> Arc<Dashboard> {
    let mut config = TomlConfig::default();
    for key in SOURCE_KEYS {
        config.sources.insert(
            key.to_string(),
            SourceOverride {
                enabled: Some(false),
                ..Default::default()
            },
        );
    }
    let dashboard = Dashboard::new(&config, Arc::new(CacheStore::in_memory()), EventBus::new(8))
        .expect("Should build dashboard");
    Arc::new(dashboard)
}

fn setup_app() -> axum::Router {
    build_router(AppState::new(disabled_dashboard()))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = setup_app().oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "dash-feed");
    assert!(body["version"].is_string());
    assert_eq!(body["sources"], json!({"total": 5, "enabled": 0, "live": 0, "loading": 0}));
}

#[tokio::test]
async fn test_health_reports_starting_before_first_data() {
    // Sales stays enabled but is never polled, so it has no data yet
    let mut config = TomlConfig::default();
    for key in SOURCE_KEYS.iter().filter(|key| **key != "sales") {
        config.sources.insert(
            key.to_string(),
            SourceOverride {
                enabled: Some(false),
                ..Default::default()
            },
        );
    }
    let dashboard = Dashboard::new(&config, Arc::new(CacheStore::in_memory()), EventBus::new(8)).unwrap();
    let app = build_router(AppState::new(Arc::new(dashboard)));

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "starting");
    assert_eq!(body["sources"]["enabled"], 1);
    assert_eq!(body["sources"]["loading"], 1);
}

#[tokio::test]
async fn test_buildinfo() {
    let response = setup_app().oneshot(test_request("GET", "/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
    assert_eq!(body["sources"], json!(["sales", "marketing", "finance", "hr", "support"]));
}

#[tokio::test]
async fn test_sources_listing() {
    let response = setup_app().oneshot(test_request("GET", "/api/sources")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let sources = body.as_array().unwrap();
    let keys: Vec<&str> = sources.iter().map(|s| s["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["sales", "marketing", "finance", "hr", "support"]);

    // Disabled and uncached: seed where a domain has one, never loading
    assert_eq!(sources[0]["records"], 0);
    assert_eq!(sources[1]["records"], 3);
    assert_eq!(sources[4]["records"], 1);
    for source in sources {
        assert_eq!(source["loading"], false);
        assert_eq!(source["isUsingLiveData"], false);
        assert_eq!(source["stale"], true);
        assert_eq!(source["enabled"], false);
    }
}

#[tokio::test]
async fn test_domain_view_shape() {
    let response = setup_app().oneshot(test_request("GET", "/api/marketing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["rawData"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["loading"], false);
    assert_eq!(body["isUsingLiveData"], false);
    assert!(body["kpis"]["totalCampaignSpend"].as_f64().unwrap() > 0.0);
    assert!(body["filterOptions"]["marketingChannels"].is_array());
    assert!(body["insights"].as_array().unwrap().len() >= 1);
    assert!(body["lastRefreshed"].is_null());
}

#[tokio::test]
async fn test_query_does_not_store_criteria() {
    let app = setup_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/marketing/query",
            &json!({ "searchQuery": "no campaign is called this" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert!(body["insights"].as_array().unwrap().is_empty());

    let response = app.oneshot(test_request("GET", "/api/marketing")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["criteria"]["searchQuery"], "");
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_put_criteria_is_stored() {
    let app = setup_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/support/criteria",
            &json!({ "priorities": ["Low"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app.oneshot(test_request("GET", "/api/support")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["criteria"]["priorities"], json!(["Low"]));
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["rawData"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_on_disabled_source_is_skipped() {
    let response = setup_app()
        .oneshot(test_request("POST", "/api/sales/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "skipped");
    assert_eq!(body["reason"], "disabled");
}

#[tokio::test]
async fn test_malformed_criteria_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/hr/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = setup_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "BAD_REQUEST");

    let response = setup_app()
        .oneshot(json_request("PUT", "/api/hr/criteria", &json!({ "departments": "Ops" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_domain_is_json_404() {
    let response = setup_app().oneshot(test_request("GET", "/api/operations")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "NOT_FOUND");
    assert!(body["message"].as_str().unwrap().contains("/api/operations"));
}

#[tokio::test]
async fn test_event_stream_ends_on_shutdown() {
    let state = AppState::new(disabled_dashboard());
    let shutdown = state.shutdown_token();
    let response = build_router(state)
        .oneshot(test_request("GET", "/api/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert!(String::from_utf8_lossy(&first).contains("ConnectionStatus"));

    shutdown.cancel();
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(chunk) = body.next().await {
            chunk.unwrap();
        }
    })
    .await;
    assert!(drained.is_ok(), "SSE stream should close after shutdown");
}

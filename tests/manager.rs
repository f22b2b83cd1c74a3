//! End-to-end facade tests against a local mock HTTP server.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::mock_server::MockHttpServer;
use serde::Deserialize;
use serde_json::json;
use wraith::{
    Error, NetworkingManager, RequestOptions, Shape, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};

#[derive(Debug, Deserialize, PartialEq)]
struct Account {
    name: String,
    balance: i64,
}

fn account_shape() -> Shape<Account> {
    Shape::new(&json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "balance": { "type": "integer" }
        },
        "required": ["name", "balance"]
    }))
    .unwrap()
}

async fn started_server() -> String {
    let server = MockHttpServer::new().await.unwrap();
    let url = server.url();
    server.start();
    url
}

#[tokio::test]
async fn test_raw_request_returns_response() {
    wraith::logging::init();
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let response = manager
        .get(&format!("{}/hello", base), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().unwrap(), "Hello");
}

#[tokio::test]
async fn test_typed_request_validates_body() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let typed = manager
        .get_typed(&format!("{}/json", base), &account_shape(), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(
        typed.data,
        Account {
            name: "alice".into(),
            balance: 42
        }
    );
    assert_eq!(typed.response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_status_404_fails_raw_request() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let err = manager
        .get(&format!("{}/status/404", base), RequestOptions::new())
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, response } => {
            assert_eq!(status, 404);
            assert_eq!(response.text().unwrap(), "missing");
        }
        other => panic!("expected HttpStatus error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_500_fails_typed_request() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let err = manager
        .get_typed(
            &format!("{}/status/500", base),
            &account_shape(),
            RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_invalid_json_body_fails_with_decode_error() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let err = manager
        .get_typed(
            &format!("{}/invalid-json", base),
            &account_shape(),
            RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_nonconforming_body_fails_with_validation_error() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let err = manager
        .get_typed(
            &format!("{}/wrong-shape", base),
            &account_shape(),
            RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_default_headers_sent() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let response = manager
        .get(&format!("{}/echo-headers", base), RequestOptions::new())
        .await
        .unwrap();

    let echoed: serde_json::Value = response.json().unwrap();
    assert_eq!(echoed["accept"], "*/*");
    assert_eq!(echoed["user-agent"], DEFAULT_USER_AGENT);
    assert_eq!(echoed["accept-encoding"], "gzip,deflate");
}

#[tokio::test]
async fn test_caller_headers_override_and_pass_through() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let options = RequestOptions::new()
        .header("user-agent", "X")
        .header("x-custom", "Y");
    let response = manager
        .get(&format!("{}/echo-headers", base), options)
        .await
        .unwrap();

    let echoed: serde_json::Value = response.json().unwrap();
    assert_eq!(echoed["user-agent"], "X");
    assert_eq!(echoed["x-custom"], "Y");
    // The other defaults still ride along.
    assert_eq!(echoed["accept"], "*/*");
    assert_eq!(echoed["accept-encoding"], "gzip,deflate");
}

#[tokio::test]
async fn test_post_with_body() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let options = RequestOptions::new()
        .header("content-type", "application/json")
        .body(r#"{"payload":true}"#);
    let response = manager.post(&format!("{}/hello", base), options).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[test]
fn test_default_timeout_is_nine_seconds() {
    assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(9));
}

#[tokio::test]
async fn test_short_timeout_fails_slow_request() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let err = manager
        .get(
            &format!("{}/slow", base),
            RequestOptions::new().timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(d) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn test_default_timeout_survives_slow_request() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    // The slow route answers after one second, well inside the default.
    let response = manager
        .get(&format!("{}/slow", base), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.text().unwrap(), "finally");
}

#[tokio::test]
async fn test_proxy_option_is_discarded() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    let response = manager
        .get(
            &format!("{}/hello", base),
            RequestOptions::new().proxy("http://proxy.invalid:3128"),
        )
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_cold_manager_starts_implicitly() {
    let base = started_server().await;
    let manager = NetworkingManager::new();
    assert!(!manager.is_active().await);

    let response = manager
        .get(&format!("{}/hello", base), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(manager.is_active().await);
}

#[tokio::test]
async fn test_concurrent_cold_start_collapses_to_one_handle() {
    let base = started_server().await;
    let manager = Arc::new(NetworkingManager::new());

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        let url = format!("{}/hello", base);
        tasks.push(tokio::spawn(async move {
            manager.get(&url, RequestOptions::new()).await
        }));
    }

    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }
    assert!(manager.is_active().await);
}

#[tokio::test]
async fn test_requests_work_after_shutdown_and_restart() {
    let base = started_server().await;
    let manager = NetworkingManager::new();

    manager.startup().await;
    manager.shutdown().await;
    assert!(!manager.is_active().await);

    // A request against the closed manager re-initializes the handle.
    let response = manager
        .get(&format!("{}/hello", base), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(manager.is_active().await);
}

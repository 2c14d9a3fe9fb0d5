//! # RPC Tests
//!
//! A real service host on a local port, reached through the HTTP transport.

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use cafebot::client::{HttpTransport, ServiceClient};
use cafebot::errors::{ErrorCode, ErrorKind, RpcError};
use cafebot::memory::InMemoryMenuRepository;
use cafebot::rpc::{Request, Response, ServiceKind};
use cafebot::server;
use cafebot::services::MenuService;

/// Start a menu service and return its base URL
async fn spawn_menu_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let dispatcher = Arc::new(MenuService::new(Arc::new(
        InMemoryMenuRepository::with_default_categories(),
    )));
    tokio::spawn(server::serve(listener, dispatcher));
    format!("http://{addr}/")
}

fn client_for(url: String) -> ServiceClient {
    let urls = HashMap::from([(ServiceKind::Menu, url)]);
    let transport = HttpTransport::new(urls, Duration::from_secs(5)).unwrap();
    ServiceClient::new(Arc::new(transport))
}

#[tokio::test]
async fn test_typed_calls_over_http() {
    let client = client_for(spawn_menu_service().await);

    let created = client.create_category("Dessert").await.unwrap();
    assert_eq!(created.name, "Dessert");

    let names: Vec<String> = client
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Coffee", "Dessert", "Drinks", "Food", "Snack"]);

    let err = client.create_category("Dessert").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_unknown_action_is_invalid_input() {
    let client = client_for(spawn_menu_service().await);

    let err = client
        .submit(ServiceKind::Menu, Request::new("brew", json!({})))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RpcError::Service {
            code: ErrorCode::InvalidInput,
            message: "Unknown action".to_string(),
        }
    );
}

#[tokio::test]
async fn test_undecodable_body_gets_an_envelope() {
    let url = spawn_menu_service().await;

    let response = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let envelope: Response = response.json().await.unwrap();
    assert!(!envelope.success);
    let error = envelope.error.unwrap();
    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert_eq!(error.message, "Invalid request format");
}

#[tokio::test]
async fn test_non_post_is_rejected_with_envelope() {
    let url = spawn_menu_service().await;

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("ERR_INVALID_INPUT"));
    assert_eq!(body["error"]["message"], json!("Method not allowed"));
}

#[tokio::test]
async fn test_health() {
    let url = spawn_menu_service().await;
    let body = reqwest::get(format!("{url}health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // grab a free port, then close it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(format!("http://{addr}/"));
    let err = client.list_categories().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_missing_url_is_unavailable() {
    let client = client_for(spawn_menu_service().await);
    let err = client.cafe_info().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_timeout_is_unavailable_and_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/",
        post({
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(json!({ "success": true, "data": { "categories": [] } }))
                }
            }
        }),
    );
    tokio::spawn(async move { axum::serve(listener, app).await });

    let urls = HashMap::from([(ServiceKind::Menu, format!("http://{addr}/"))]);
    let transport = HttpTransport::new(urls, Duration::from_millis(100)).unwrap();
    let client = ServiceClient::new(Arc::new(transport));

    let started = Instant::now();
    let err = client.list_categories().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(err, RpcError::Unavailable(_)));
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

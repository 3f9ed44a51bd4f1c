//! Gateway behaviour at the HTTP boundary: headers, bodies and failure kinds.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::{get, post};
use axum::{Json, Router};
use nexus_client::gateway::Method;
use nexus_client::{ApiGateway, ClientConfig, HttpError, SessionManager};
use serde_json::{Value, json};

async fn echo_auth(headers: HeaderMap, body: Option<Json<Value>>) -> Json<Value> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "authorization": auth, "body": body.map(|Json(v)| v) }))
}

async fn serve(app: Router) -> ClientConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    ClientConfig::new(&format!("http://{addr}")).expect("url")
}

async fn test_gateway() -> ApiGateway {
    let app = Router::new()
        .route("/echo", post(echo_auth))
        .route("/broken", get(|| async { ([("content-type", "application/json")], "{not json") }))
        .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/teapot",
            get(|| async { (StatusCode::IM_A_TEAPOT, Json(json!({ "detail": "short and stout" }))) }),
        )
        .route("/slow", get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({}))
        }));
    let config = serve(app).await.with_timeout(Duration::from_millis(200));
    ApiGateway::new(&config).expect("gateway")
}

#[tokio::test]
async fn bearer_header_only_when_token_given() {
    let gateway = test_gateway().await;
    let sessions = SessionManager::new(gateway.clone());
    let session = sessions.resume("tok-123");

    let with = gateway
        .request(Method::POST, "/echo", Some(&json!({ "a": 1 })), Some(session.token()))
        .await
        .expect("echo");
    assert_eq!(with["authorization"], "Bearer tok-123");
    assert_eq!(with["body"], json!({ "a": 1 }));

    let without = gateway
        .request::<Value>(Method::POST, "/echo", None, None)
        .await
        .expect("echo");
    assert!(without["authorization"].is_null());
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let gateway = test_gateway().await;
    let err = gateway
        .request::<()>(Method::GET, "/broken", None, None)
        .await
        .expect_err("malformed");
    assert!(matches!(err, HttpError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn empty_body_is_null() {
    let gateway = test_gateway().await;
    let value = gateway
        .request::<()>(Method::GET, "/empty", None, None)
        .await
        .expect("empty");
    assert!(value.is_null());
}

#[tokio::test]
async fn error_status_carries_detail() {
    let gateway = test_gateway().await;
    let err = gateway
        .request::<()>(Method::GET, "/teapot", None, None)
        .await
        .expect_err("teapot");
    assert_eq!(
        err,
        HttpError::Server {
            status: 418,
            detail: "short and stout".into()
        }
    );
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let gateway = test_gateway().await;
    let err = gateway
        .request::<()>(Method::GET, "/nowhere", None, None)
        .await
        .expect_err("404");
    assert!(matches!(err, HttpError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let gateway = test_gateway().await;
    let err = gateway
        .request::<()>(Method::GET, "/slow", None, None)
        .await
        .expect_err("timeout");
    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let config = ClientConfig::new(&format!("http://{addr}")).expect("url");
    let gateway = ApiGateway::new(&config).expect("gateway");
    let err = gateway
        .request::<()>(Method::GET, "/healthdata/", None, None)
        .await
        .expect_err("refused");
    assert!(matches!(err, HttpError::Network(_)), "got {err:?}");
}

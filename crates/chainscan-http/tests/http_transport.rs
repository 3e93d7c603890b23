//! `HttpRpcClient` against a local axum JSON-RPC stub.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use chainscan_core::{
    Endpoint, ErrorClass, ErrorClassifier, JsonRpcRequest, RpcTransport, TransportError,
};
use chainscan_http::{HttpClientConfig, HttpRpcClient};

async fn node(Json(req): Json<Value>) -> Json<Value> {
    let result = match req["method"].as_str() {
        Some("eth_blockNumber") => json!("0x12d687"),
        _ => Value::Null,
    };
    Json(json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }))
}

async fn limited() -> (StatusCode, &'static str) {
    (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
}

async fn capped(Json(req): Json<Value>) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": req["id"],
        "error": { "code": -32005, "message": "query returned more than 10000 results" }
    }))
}

async fn garbage() -> &'static str {
    "<html>bad gateway</html>"
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/node", post(node))
        .route("/limited", post(limited))
        .route("/capped", post(capped))
        .route("/garbage", post(garbage));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, path: &str) -> HttpRpcClient {
    HttpRpcClient::new(format!("http://{addr}{path}"), &HttpClientConfig::default()).unwrap()
}

#[tokio::test]
async fn reads_block_number() {
    let addr = spawn_stub().await;
    let endpoint = Endpoint::new(std::sync::Arc::new(client(addr, "/node")));
    assert_eq!(endpoint.block_number().await.unwrap(), 1_234_567);
}

#[tokio::test]
async fn non_success_status_is_status_error() {
    let addr = spawn_stub().await;
    let err = client(addr, "/limited")
        .send(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");
    assert_eq!(ErrorClassifier::default().classify(&err), ErrorClass::RateLimit);
}

#[tokio::test]
async fn rpc_error_object_is_passed_through() {
    let addr = spawn_stub().await;
    let resp = client(addr, "/capped")
        .send(JsonRpcRequest::new(1, "eth_getLogs", vec![]))
        .await
        .unwrap();
    let err = TransportError::Rpc(resp.into_result().unwrap_err());
    assert_eq!(err.rpc_code(), Some(-32005));
    assert_eq!(ErrorClassifier::default().classify(&err), ErrorClass::RateLimit);
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let addr = spawn_stub().await;
    let err = client(addr, "/garbage")
        .send(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Malformed(ref m) if m.contains("bad gateway")), "{err}");
}

#[tokio::test]
async fn connection_refused_is_http_error() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = client(addr, "/node")
        .send(JsonRpcRequest::new(1, "eth_blockNumber", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Http(_)), "{err}");
    assert_eq!(ErrorClassifier::default().classify(&err), ErrorClass::Generic);
}

//! End-to-end tests over a real listener

use std::net::{IpAddr, Ipv4Addr};

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::support::RecordingRegistrar;
use crate::config::{ApiKeyAuth, ServerConfig};
use crate::error::GatewayError;
use crate::server::GatewayServer;

async fn start(config: ServerConfig) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let server = GatewayServer::builder()
        .config(config)
        .registrar(RecordingRegistrar::new())
        .credential_lookup(|name| (name == "mcp_api_key").then(|| "secret".to_string()))
        .build()
        .unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let bound = server.bind_listener(listener).await.unwrap();
    let url = format!("http://{}/mcp", bound.local_addr());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        bound
            .serve_with_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });
    (url, shutdown_tx, task)
}

#[tokio::test]
async fn test_initialize_over_http() {
    let (url, shutdown, task) = start(ServerConfig::builder("e2e").build().unwrap()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"}
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().get("mcp-session-id").is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "e2e");

    shutdown.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_auth_scenario_over_http() {
    let config = ServerConfig::builder("e2e")
        .api_key(ApiKeyAuth::new())
        .build()
        .unwrap();
    let (url, shutdown, task) = start(config).await;
    let client = reqwest::Client::new();
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let response = client
        .post(&url)
        .header("Authorization", "Bearer secret")
        .json(&ping)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let response = client
        .post(&url)
        .header("Authorization", "Bearer wrong")
        .json(&ping)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"jsonrpc":"2.0","error":{"code":-32011,"message":"Forbidden: Invalid API key"},"id":null}"#
    );

    shutdown.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_get_over_http() {
    let (url, shutdown, task) = start(ServerConfig::builder("e2e").build().unwrap()).await;

    let response = reqwest::Client::new().get(&url).send().await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32000);

    shutdown.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let config = ServerConfig::builder("e2e")
        .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .port(port)
        .log_registrations(false)
        .build()
        .unwrap();
    let server = GatewayServer::builder()
        .config(config)
        .registrar(RecordingRegistrar::new())
        .build()
        .unwrap();

    match server.bind().await {
        Err(GatewayError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("bind should fail while the port is taken"),
    }
}

#[tokio::test]
async fn test_missing_registrar_is_a_config_error() {
    let result = GatewayServer::builder().build();
    assert!(matches!(result, Err(GatewayError::Config(_))));
}

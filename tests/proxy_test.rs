//! Forwarding behavior through a running sidecar.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use consulize::config::SidecarConfig;
use consulize::lifecycle::{Orchestrator, Outcome, Shutdown};

mod common;
use common::FakeRegistry;

/// Run a sidecar in the background until the returned token is triggered.
async fn start_sidecar(
    config: SidecarConfig,
    registry: Arc<FakeRegistry>,
) -> (Shutdown, tokio::task::JoinHandle<Outcome>) {
    let port = config.service.port;
    let shutdown = Shutdown::new();
    let orchestrator = Orchestrator::new(config, registry.clone(), shutdown.subscribe());
    let task = tokio::spawn(orchestrator.run());

    registry.wait_registered().await;
    common::wait_for_port(SocketAddr::from(([127, 0, 0, 1], port))).await;
    (shutdown, task)
}

async fn stop(shutdown: Shutdown, task: tokio::task::JoinHandle<Outcome>) -> Outcome {
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("sidecar did not stop")
        .unwrap()
}

#[tokio::test]
async fn test_health_check_answered_locally() {
    let backend_addr: SocketAddr = "127.0.0.1:28301".parse().unwrap();
    let seen = common::start_echo_backend(backend_addr).await;

    let config = common::sidecar_config(28302, "http://127.0.0.1:28301");
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let res = reqwest::get("http://127.0.0.1:28302/health").await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().is_empty());
    assert!(seen.lock().unwrap().is_empty(), "backend must not see health probes");

    let outcome = stop(shutdown, task).await;
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_path_prefix_applied_once() {
    let backend_addr: SocketAddr = "127.0.0.1:28311".parse().unwrap();
    let seen = common::start_echo_backend(backend_addr).await;

    let config = common::sidecar_config(28312, "http://127.0.0.1:28311/api");
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let body = reqwest::get("http://127.0.0.1:28312/widgets?color=red")
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "/api/widgets?color=red");

    // Root joins onto the prefix with a single slash
    let res = reqwest::get("http://127.0.0.1:28312/").await.unwrap();
    assert_eq!(res.text().await.unwrap(), "/api/");
    assert_eq!(seen.lock().unwrap().len(), 2);

    stop(shutdown, task).await;
}

#[tokio::test]
async fn test_transmit_health_forwards_check() {
    let backend_addr: SocketAddr = "127.0.0.1:28321".parse().unwrap();
    let seen = common::start_echo_backend(backend_addr).await;

    let mut config = common::sidecar_config(28322, "http://127.0.0.1:28321");
    config.transmit_health = true;
    config.health.path = "status".to_string();
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let body = reqwest::get("http://127.0.0.1:28322/status").await.unwrap().text().await.unwrap();
    assert_eq!(body, "/status");
    assert_eq!(seen.lock().unwrap().as_slice(), ["/status".to_string()]);

    stop(shutdown, task).await;
}

#[tokio::test]
async fn test_unreachable_backend_returns_bad_gateway() {
    // Nothing listens on 28331
    let config = common::sidecar_config(28332, "http://127.0.0.1:28331");
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let res = reqwest::get("http://127.0.0.1:28332/anything").await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    // The sidecar keeps serving after a failed exchange
    let res = reqwest::get("http://127.0.0.1:28332/health").await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let outcome = stop(shutdown, task).await;
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_websocket_relay() {
    let backend_addr: SocketAddr = "127.0.0.1:28341".parse().unwrap();
    common::start_ws_echo_backend(backend_addr).await;

    let config = common::sidecar_config(28342, "ws://127.0.0.1:28341");
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let (mut ws, _) = tokio_tungstenite::connect_async("ws://127.0.0.1:28342/socket")
        .await
        .unwrap();

    ws.send(Message::text("hello")).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_text().unwrap().as_str(), "hello");

    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(&reply.into_data()[..], &[1u8, 2, 3]);

    ws.close(None).await.unwrap();

    // Health is still answered locally for a WebSocket target
    let res = reqwest::get("http://127.0.0.1:28342/health").await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    stop(shutdown, task).await;
}

#[tokio::test]
async fn test_websocket_backend_down_rejects_upgrade() {
    let config = common::sidecar_config(28352, "ws://127.0.0.1:28351");
    let (shutdown, task) = start_sidecar(config, Arc::new(FakeRegistry::new())).await;

    let result = tokio_tungstenite::connect_async("ws://127.0.0.1:28352/").await;
    assert!(result.is_err());

    stop(shutdown, task).await;
}

//! Startup and shutdown ordering against an in-memory registry.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use consulize::lifecycle::{LifecycleError, LifecycleState, Orchestrator, Shutdown};

mod common;
use common::{FakeRegistry, RegistryCall};

#[tokio::test]
async fn test_unsupported_scheme_never_listens_or_registers() {
    let registry = Arc::new(FakeRegistry::new());
    let config = common::sidecar_config(28401, "ftp://x");

    let outcome = Orchestrator::new(config, registry.clone(), Shutdown::new().subscribe())
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.final_state, LifecycleState::Failed);
    assert!(!outcome.history.contains(&LifecycleState::Serving));
    assert!(registry.calls().is_empty());
    assert!(!common::port_is_open("127.0.0.1:28401".parse().unwrap()).await);
}

#[tokio::test]
async fn test_bind_conflict_prevents_registration() {
    let _occupied = tokio::net::TcpListener::bind("127.0.0.1:28411").await.unwrap();
    let registry = Arc::new(FakeRegistry::new());
    let config = common::sidecar_config(28411, "http://127.0.0.1:28412");

    let outcome = Orchestrator::new(config, registry.clone(), Shutdown::new().subscribe())
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.error, Some(LifecycleError::ListenerStartup(_))));
    assert!(!outcome.history.contains(&LifecycleState::Registering));
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn test_registration_failure_closes_listener() {
    let addr: SocketAddr = "127.0.0.1:28421".parse().unwrap();
    let registry = Arc::new(FakeRegistry::new().failing_register());
    let config = common::sidecar_config(28421, "http://127.0.0.1:28422");

    let outcome = Orchestrator::new(config, registry.clone(), Shutdown::new().subscribe())
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(outcome.error, Some(LifecycleError::Registration(_))));
    assert_eq!(
        outcome.history,
        vec![
            LifecycleState::Starting,
            LifecycleState::Serving,
            LifecycleState::Registering,
            LifecycleState::Failed,
        ]
    );
    assert!(registry.deregistered_ids().is_empty());
    assert!(!common::port_is_open(addr).await, "no dangling open port");
}

#[tokio::test]
async fn test_deregisters_before_listener_closes() {
    let addr: SocketAddr = "127.0.0.1:28431".parse().unwrap();
    let registry = Arc::new(FakeRegistry::new().watching(addr));
    let config = common::sidecar_config(28431, "http://127.0.0.1:28432");

    let shutdown = Shutdown::new();
    let task = tokio::spawn(Orchestrator::new(config, registry.clone(), shutdown.subscribe()).run());

    let id = registry.wait_registered().await;
    assert!(common::port_is_open(addr).await);
    shutdown.trigger();

    let outcome = tokio::time::timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(
        outcome.history,
        vec![
            LifecycleState::Starting,
            LifecycleState::Serving,
            LifecycleState::Registering,
            LifecycleState::Running,
            LifecycleState::Deregistering,
            LifecycleState::ShuttingDown,
            LifecycleState::Stopped,
        ]
    );

    let calls = registry.calls();
    assert!(calls.contains(&RegistryCall::Deregister { id, listener_alive: true }));
    assert!(!common::port_is_open(addr).await);
}

#[tokio::test]
async fn test_double_signal_deregisters_once() {
    let registry = Arc::new(FakeRegistry::new());
    let config = common::sidecar_config(28441, "http://127.0.0.1:28442");

    let shutdown = Shutdown::new();
    let task = tokio::spawn(Orchestrator::new(config, registry.clone(), shutdown.subscribe()).run());

    let id = registry.wait_registered().await;
    assert!(shutdown.trigger());
    assert!(!shutdown.trigger());

    let outcome = tokio::time::timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert_eq!(outcome.final_state, LifecycleState::Stopped);
    assert_eq!(registry.deregistered_ids(), vec![id]);
}

#[tokio::test]
async fn test_reaps_only_stale_entries_on_same_address() {
    let registry = Arc::new(
        FakeRegistry::new()
            .with_service("consulize-stale", "127.0.0.1", 28451)
            .with_service("consulize-other-port", "127.0.0.1", 9999)
            .with_service("consulize-other-host", "10.0.0.9", 28451),
    );
    let mut config = common::sidecar_config(28451, "http://127.0.0.1:28452");
    config.service.id = Some("consulize-current".to_string());

    let shutdown = Shutdown::new();
    let task = tokio::spawn(Orchestrator::new(config, registry.clone(), shutdown.subscribe()).run());

    registry.wait_registered().await;
    // Reaping runs right after registration; give it a moment to finish
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(registry.deregistered_ids(), vec!["consulize-stale".to_string()]);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert_eq!(
        registry.deregistered_ids(),
        vec!["consulize-stale".to_string(), "consulize-current".to_string()]
    );
}

#[tokio::test]
async fn test_shutdown_before_registration_skips_registry() {
    let registry = Arc::new(FakeRegistry::new());
    let config = common::sidecar_config(28461, "http://127.0.0.1:28462");

    let shutdown = Shutdown::new();
    shutdown.trigger();

    let outcome = Orchestrator::new(config, registry.clone(), shutdown.subscribe())
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.final_state, LifecycleState::Stopped);
    assert!(registry.calls().is_empty());
}

#[tokio::test]
async fn test_failed_deregistration_still_stops_cleanly() {
    let addr: SocketAddr = "127.0.0.1:28471".parse().unwrap();
    let registry = Arc::new(FakeRegistry::new().failing_deregister());
    let config = common::sidecar_config(28471, "http://127.0.0.1:28472");

    let shutdown = Shutdown::new();
    let task = tokio::spawn(Orchestrator::new(config, registry.clone(), shutdown.subscribe()).run());

    let id = registry.wait_registered().await;
    shutdown.trigger();

    let outcome = tokio::time::timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert_eq!(outcome.final_state, LifecycleState::Stopped);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(registry.deregistered_ids(), vec![id]);
    assert!(!common::port_is_open(addr).await);
}

#[tokio::test]
async fn test_close_timeout_exits_with_code_two() {
    let backend_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    let held = common::start_stalled_backend(backend_addr).await;

    let mut config = common::sidecar_config(28482, "http://127.0.0.1:28481");
    config.lifecycle.drain_window_ms = 50;
    config.lifecycle.close_timeout_ms = 300;
    let registry = Arc::new(FakeRegistry::new());

    let shutdown = Shutdown::new();
    let task = tokio::spawn(Orchestrator::new(config, registry.clone(), shutdown.subscribe()).run());
    registry.wait_registered().await;

    // Keep one request in flight for longer than the close timeout
    let pending = tokio::spawn(reqwest::get("http://127.0.0.1:28482/slow"));
    while held.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    shutdown.trigger();

    let outcome = tokio::time::timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert!(matches!(outcome.error, Some(LifecycleError::Close(_))));
    assert_eq!(outcome.exit_code(), 2);
    assert_eq!(outcome.final_state, LifecycleState::Failed);
    assert_eq!(outcome.history[outcome.history.len() - 2], LifecycleState::ShuttingDown);
    assert_eq!(registry.deregistered_ids().len(), 1);

    pending.abort();
}

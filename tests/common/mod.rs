//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use consulize::config::SidecarConfig;
use consulize::registry::{
    AgentService, RegistryClient, RegistryError, RegistryResult, Scope, ServiceRegistration,
};

/// Sidecar config listening on `127.0.0.1:port` with short lifecycle timings.
pub fn sidecar_config(port: u16, target: &str) -> SidecarConfig {
    let mut config = SidecarConfig::default();
    config.target = target.to_string();
    config.service.port = port;
    config.listener.bind_host = "127.0.0.1".to_string();
    config.lifecycle.startup_grace_ms = 2000;
    config.lifecycle.drain_window_ms = 100;
    config.lifecycle.close_timeout_ms = 2000;
    config
}

/// Start a backend that answers every request with its request target
/// (path and query) as the body, and records what it saw.
pub async fn start_echo_backend(addr: SocketAddr) -> Arc<Mutex<Vec<String>>> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(target) = read_request_target(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(target.clone());

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            target.len(),
                            target
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    seen
}

/// Start a backend that accepts requests and never answers them.
/// Returns the number of connections it is holding open.
pub async fn start_stalled_backend(addr: SocketAddr) -> Arc<AtomicUsize> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let held = Arc::new(AtomicUsize::new(0));
    let counter = held.clone();

    tokio::spawn(async move {
        let mut sockets = Vec::new();
        while let Ok((mut socket, _)) = listener.accept().await {
            if read_request_target(&mut socket).await.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            sockets.push(socket);
        }
    });

    held
}

/// Read a request head and return the request-target from its first line.
async fn read_request_target(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    head.lines().next()?.split_whitespace().nth(1).map(str::to_string)
}

/// Start a WebSocket backend that echoes text and binary frames.
pub async fn start_ws_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if msg.is_text() || msg.is_binary() {
                        if ws.send(msg).await.is_err() {
                            break;
                        }
                    } else if msg.is_close() {
                        break;
                    }
                }
            });
        }
    });
}

/// Poll until `addr` accepts TCP connections.
pub async fn wait_for_port(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{addr} never became reachable");
}

pub async fn port_is_open(addr: SocketAddr) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

/// Observable registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Register(String),
    List,
    /// Deregistered id and whether the watched listener still accepted connections.
    Deregister { id: String, listener_alive: bool },
}

/// In-memory registry that records every call.
#[derive(Default)]
pub struct FakeRegistry {
    calls: Mutex<Vec<RegistryCall>>,
    services: Mutex<Vec<AgentService>>,
    fail_register: bool,
    fail_deregister: bool,
    watched: Option<SocketAddr>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration attempts fail with a transport error.
    pub fn failing_register(mut self) -> Self {
        self.fail_register = true;
        self
    }

    /// Deregistration attempts are recorded, then fail with a transport error.
    pub fn failing_deregister(mut self) -> Self {
        self.fail_deregister = true;
        self
    }

    /// Check whether `addr` is still accepting when a deregistration arrives.
    pub fn watching(mut self, addr: SocketAddr) -> Self {
        self.watched = Some(addr);
        self
    }

    pub fn with_service(self, id: &str, address: &str, port: u16) -> Self {
        self.services.lock().unwrap().push(AgentService {
            id: id.to_string(),
            service: "consulize".to_string(),
            address: address.to_string(),
            port,
            tags: Vec::new(),
        });
        self
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn registered_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Register(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn deregistered_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RegistryCall::Deregister { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Wait until a registration has been recorded.
    pub async fn wait_registered(&self) -> String {
        for _ in 0..200 {
            if let Some(id) = self.registered_ids().into_iter().next() {
                return id;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("service was never registered");
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn register_service(&self, registration: &ServiceRegistration) -> RegistryResult<()> {
        if self.fail_register {
            return Err(RegistryError::Transport("connection refused".to_string()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(RegistryCall::Register(registration.id.clone()));
        self.services.lock().unwrap().push(AgentService {
            id: registration.id.clone(),
            service: registration.name.clone(),
            address: registration.address.clone(),
            port: registration.port,
            tags: registration.tags.clone(),
        });
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str, _scope: &Scope) -> RegistryResult<()> {
        let listener_alive = match self.watched {
            Some(addr) => port_is_open(addr).await,
            None => false,
        };
        self.calls.lock().unwrap().push(RegistryCall::Deregister {
            id: service_id.to_string(),
            listener_alive,
        });
        if self.fail_deregister {
            return Err(RegistryError::Transport("agent unreachable".to_string()));
        }
        self.services.lock().unwrap().retain(|s| s.id != service_id);
        Ok(())
    }

    async fn list_services(&self, _scope: &Scope) -> RegistryResult<Vec<AgentService>> {
        self.calls.lock().unwrap().push(RegistryCall::List);
        Ok(self.services.lock().unwrap().clone())
    }
}

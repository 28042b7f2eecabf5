//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the sidecar.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Backend URL to proxy to (http, https, ws or wss).
    pub target: String,

    /// Pass health checks through to the backend instead of answering locally.
    pub transmit_health: bool,

    /// Registry health check settings.
    pub health: HealthCheckConfig,

    /// Identity this instance registers under.
    pub service: ServiceConfig,

    /// Registry agent connection.
    pub registry: RegistryConfig,

    /// Startup and shutdown timing.
    pub lifecycle: LifecycleConfig,

    /// Listener configuration.
    pub listener: ListenerConfig,

    /// WebSocket forwarding behavior.
    pub websocket: WebSocketConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            target: "http://127.0.0.1:80".to_string(),
            transmit_health: false,
            health: HealthCheckConfig::default(),
            service: ServiceConfig::default(),
            registry: RegistryConfig::default(),
            lifecycle: LifecycleConfig::default(),
            listener: ListenerConfig::default(),
            websocket: WebSocketConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Health check configuration.
///
/// Timings are registry duration strings and are passed through unchanged.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path answered (or forwarded) for health probes, without leading slash.
    pub path: String,

    /// Probe timeout.
    pub timeout: String,

    /// Probe interval.
    pub interval: String,

    /// How long the registry keeps a critical instance before removing it.
    pub deregister_critical_after: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "health".to_string(),
            timeout: "3s".to_string(),
            interval: "5s".to_string(),
            deregister_critical_after: "30s".to_string(),
        }
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name in the registry.
    pub name: String,

    /// Instance id. Generated from the name when absent.
    pub id: Option<String>,

    /// Address the registry uses to reach this instance.
    pub host: String,

    /// Port the registry uses to reach this instance (also the listen port).
    pub port: u16,

    /// Registry namespace (enterprise feature).
    pub namespace: Option<String>,

    /// Registry admin partition (enterprise feature).
    pub partition: Option<String>,

    /// Registry tags.
    pub tags: Vec<String>,

    /// File holding a JSON array of extra tags.
    pub tags_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "consulize".to_string(),
            id: None,
            host: "127.0.0.1".to_string(),
            port: 8890,
            namespace: None,
            partition: None,
            tags: Vec::new(),
            tags_file: None,
        }
    }
}

/// Registry agent connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Agent address (host:port).
    pub address: String,

    /// Agent scheme (http or https).
    pub scheme: String,

    /// ACL token sent with every request.
    pub token: Option<String>,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8500".to_string(),
            scheme: "http".to_string(),
            token: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl RegistryConfig {
    /// Base URL of the registry agent.
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.trim_end_matches('/').to_string()
        } else {
            format!("{}://{}", self.scheme, self.address.trim_end_matches('/'))
        }
    }
}

/// Startup and shutdown timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Maximum wait for the listener to report it is bound.
    pub startup_grace_ms: u64,

    /// Wait between deregistration and listener close.
    pub drain_window_ms: u64,

    /// Maximum wait for the listener to finish closing.
    pub close_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            startup_grace_ms: 3_000,
            drain_window_ms: 5_000,
            close_timeout_ms: 5_000,
        }
    }
}

impl LifecycleConfig {
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.drain_window_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind. The port is always the service port.
    pub bind_host: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
        }
    }
}

/// WebSocket forwarding behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Join the request path onto the target path, as HTTP forwarding does.
    /// When false every upgrade connects to the target URL as configured.
    pub append_request_path: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Prometheus exporter bind address. Disabled when absent.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_address: None,
        }
    }
}

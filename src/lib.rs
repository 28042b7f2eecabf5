//! Consul registration sidecar.
//!
//! Fronts a single backend, answers registry health probes locally and keeps a
//! Consul registration alive for exactly as long as the listener is serving.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registry;

pub use config::{ResolvedConfig, SidecarConfig};
pub use http::HttpServer;
pub use lifecycle::{Orchestrator, Outcome, Shutdown};

/// Crate version reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

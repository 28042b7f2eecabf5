//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle orchestrator
//!     → session.rs (register / deregister / reap_duplicates for our identity)
//!     → client.rs (RegistryClient trait, one network call per method)
//!     → consul.rs (Consul agent HTTP API via reqwest)
//! ```
//!
//! # Design Decisions
//! - Registry calls only happen during startup and shutdown, never per request
//! - The session caches nothing; the orchestrator owns the registration ticket
//! - The client is a trait object so tests substitute an in-memory registry

pub mod client;
pub mod consul;
pub mod session;
pub mod types;

pub use client::RegistryClient;
pub use consul::ConsulClient;
pub use session::RegistrySession;
pub use types::{AgentService, RegistryError, RegistryResult, Scope, ServiceCheck, ServiceRegistration};

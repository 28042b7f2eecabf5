//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (TARGET, SERVICE_*, HEALTH_*, TAGS, CONSUL_*)
//!     → validation.rs (semantic checks)
//!     → resolved.rs (TargetDescriptor, InstanceIdentity, HealthCheckSpec)
//!     → ResolvedConfig (immutable, passed by value/Arc to the orchestrator)
//! ```
//!
//! # Design Decisions
//! - Config is resolved exactly once; nothing reads ambient global state
//! - All fields have defaults so an empty environment is a valid setup
//! - A bad target scheme fails before any listener is bound

pub mod loader;
pub mod resolved;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use resolved::{HealthCheckSpec, InstanceIdentity, ResolvedConfig, TargetDescriptor, TargetScheme};
pub use schema::SidecarConfig;
pub use schema::{HealthCheckConfig, LifecycleConfig, ListenerConfig, RegistryConfig, ServiceConfig};

//! Registry client abstraction.

use async_trait::async_trait;

use crate::registry::types::{AgentService, RegistryResult, Scope, ServiceRegistration};

/// Network-facing registry operations.
///
/// Implementations perform exactly one call per method and never retry;
/// the lifecycle orchestrator owns retry and abort policy.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register (or re-register) a service instance.
    async fn register_service(&self, registration: &ServiceRegistration) -> RegistryResult<()>;

    /// Remove a service instance by id.
    async fn deregister_service(&self, service_id: &str, scope: &Scope) -> RegistryResult<()>;

    /// List every service instance known to the agent.
    async fn list_services(&self, scope: &Scope) -> RegistryResult<Vec<AgentService>>;
}

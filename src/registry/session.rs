//! Registry session for this instance.
//!
//! # Responsibilities
//! - Build the self-registration (health check points back at this process)
//! - Register and deregister this instance
//! - Reap stale registrations that collide on host:port
//!
//! # Design Decisions
//! - Holds no registration state; every call goes to the live registry
//! - Never retries; errors are returned unmodified for the caller to classify

use std::sync::Arc;

use crate::config::{HealthCheckSpec, InstanceIdentity};
use crate::registry::client::RegistryClient;
use crate::registry::types::{AgentService, RegistryResult, Scope, ServiceCheck, ServiceRegistration};

/// Registry operations scoped to one instance identity.
#[derive(Clone)]
pub struct RegistrySession {
    client: Arc<dyn RegistryClient>,
}

impl RegistrySession {
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self { client }
    }

    /// Registration payload for `identity`.
    pub fn registration(identity: &InstanceIdentity, health: &HealthCheckSpec) -> ServiceRegistration {
        ServiceRegistration {
            id: identity.service_id.clone(),
            name: identity.service_name.clone(),
            address: identity.host.clone(),
            port: identity.port,
            tags: identity.tags.clone(),
            namespace: identity.namespace.clone(),
            partition: identity.partition.clone(),
            check: ServiceCheck {
                http: health.check_url(identity),
                timeout: health.timeout.clone(),
                interval: health.interval.clone(),
                deregister_critical_service_after: health.deregister_critical_after.clone(),
            },
        }
    }

    fn scope(identity: &InstanceIdentity) -> Scope {
        Scope {
            namespace: identity.namespace.clone(),
            partition: identity.partition.clone(),
        }
    }

    /// Register this instance with its self-reporting health check.
    pub async fn register(&self, identity: &InstanceIdentity, health: &HealthCheckSpec) -> RegistryResult<()> {
        let registration = Self::registration(identity, health);
        tracing::info!(
            service_id = %registration.id,
            service = %registration.name,
            address = %registration.address,
            port = registration.port,
            check = %registration.check.http,
            "Registering service"
        );
        self.client.register_service(&registration).await
    }

    /// Remove this instance's registration.
    ///
    /// Callers skip this entirely when they do not hold a registration.
    pub async fn deregister(&self, identity: &InstanceIdentity) -> RegistryResult<()> {
        tracing::info!(service_id = %identity.service_id, "Deregistering service");
        self.client
            .deregister_service(&identity.service_id, &Self::scope(identity))
            .await
    }

    /// Deregister every entry on this identity's host:port that has a different id.
    ///
    /// Returns the number of entries removed. Stops at the first failed removal.
    pub async fn reap_duplicates(&self, identity: &InstanceIdentity) -> RegistryResult<usize> {
        let scope = Self::scope(identity);
        let services = self.client.list_services(&scope).await?;

        let stale: Vec<AgentService> = services
            .into_iter()
            .filter(|s| is_duplicate(identity, s))
            .collect();

        let mut removed = 0;
        for service in &stale {
            tracing::warn!(
                stale_id = %service.id,
                service = %service.service,
                address = %service.address,
                port = service.port,
                "Removing stale registration on our address"
            );
            self.client.deregister_service(&service.id, &scope).await?;
            removed += 1;
        }

        Ok(removed)
    }
}

/// Same host and port as `identity`, different instance id.
fn is_duplicate(identity: &InstanceIdentity, service: &AgentService) -> bool {
    service.id != identity.service_id && service.address == identity.host && service.port == identity.port
}

//! Consul agent HTTP API client.
//!
//! # Responsibilities
//! - PUT /v1/agent/service/register
//! - PUT /v1/agent/service/deregister/{id}
//! - GET /v1/agent/services
//! - Attach ACL token and namespace/partition scoping
//!
//! # Design Decisions
//! - One request per call, no retries
//! - Non-2xx responses are errors carrying the status and body

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use crate::config::RegistryConfig;
use crate::registry::client::RegistryClient;
use crate::registry::types::{AgentService, RegistryError, RegistryResult, Scope, ServiceRegistration};

/// Header carrying the ACL token.
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul agent client.
#[derive(Debug, Clone)]
pub struct ConsulClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ConsulClient {
    /// Create a client for the configured agent.
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            token: config.token.clone(),
        })
    }

    /// Agent base URL, e.g. `http://127.0.0.1:8500`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn check(response: Response) -> RegistryResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn register_service(&self, registration: &ServiceRegistration) -> RegistryResult<()> {
        let request = self
            .http
            .put(self.url("/agent/service/register"))
            .json(registration);

        let response = self.authorize(request).send().await?;
        Self::check(response).await?;

        tracing::debug!(service_id = %registration.id, "Consul register accepted");
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str, scope: &Scope) -> RegistryResult<()> {
        let request = self
            .http
            .put(self.url(&format!("/agent/service/deregister/{}", service_id)))
            .query(&scope.query_pairs());

        let response = self.authorize(request).send().await?;
        Self::check(response).await?;

        tracing::debug!(service_id = %service_id, "Consul deregister accepted");
        Ok(())
    }

    async fn list_services(&self, scope: &Scope) -> RegistryResult<Vec<AgentService>> {
        let request = self
            .http
            .get(self.url("/agent/services"))
            .query(&scope.query_pairs());

        let response = self.authorize(request).send().await?;
        let response = Self::check(response).await?;
        let services: HashMap<String, AgentService> = response.json().await?;

        Ok(services.into_values().collect())
    }
}

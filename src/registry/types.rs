//! Registry wire types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Request could not be sent or no response arrived.
    #[error("Registry transport error: {0}")]
    Transport(String),

    /// Registry answered with a non-success status.
    #[error("Registry returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded.
    #[error("Registry response decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RegistryError::Decode(e.to_string())
        } else {
            RegistryError::Transport(e.to_string())
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Agent service registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Namespace", skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "Partition", skip_serializing_if = "Option::is_none")]
    pub partition: Option<String>,
    #[serde(rename = "Check")]
    pub check: ServiceCheck,
}

/// HTTP health check attached to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCheck {
    #[serde(rename = "HTTP")]
    pub http: String,
    #[serde(rename = "Timeout")]
    pub timeout: String,
    #[serde(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    pub deregister_critical_service_after: String,
}

/// A service entry as listed by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
}

/// Namespace and partition scoping for agent calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub namespace: Option<String>,
    pub partition: Option<String>,
}

impl Scope {
    /// Query parameters understood by the agent API.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ns) = &self.namespace {
            pairs.push(("ns", ns.clone()));
        }
        if let Some(partition) = &self.partition {
            pairs.push(("partition", partition.clone()));
        }
        pairs
    }
}

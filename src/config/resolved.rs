//! Values derived once from the configuration at startup.
//!
//! `ResolvedConfig` is immutable and shared read-only with the server and the
//! orchestrator. Nothing here is recomputed per request.

use std::fmt;

use url::Url;
use uuid::Uuid;

use crate::config::loader::ConfigError;
use crate::config::schema::SidecarConfig;
use crate::config::validation::validate_config;

/// Scheme of the backend target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetScheme {
    Http,
    Https,
    Ws,
    Wss,
}

impl TargetScheme {
    fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            _ => None,
        }
    }

    /// True for ws/wss targets.
    pub fn is_websocket(&self) -> bool {
        matches!(self, Self::Ws | Self::Wss)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

impl fmt::Display for TargetScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend target derived from the configured URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub scheme: TargetScheme,
    pub host: String,
    pub port: u16,
    /// Path component of the target URL ("/" when none was given).
    pub path_prefix: String,
    /// Query string of the target URL, merged into every forwarded request.
    pub query: Option<String>,
    /// The parsed URL as configured.
    pub url: Url,
}

impl TargetDescriptor {
    /// Parse and validate a target URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|e| ConfigError::Target(format!("'{}': {}", raw, e)))?;

        let scheme = TargetScheme::parse(url.scheme()).ok_or_else(|| {
            ConfigError::Target(format!(
                "unsupported scheme '{}' (expected http, https, ws or wss)",
                url.scheme()
            ))
        })?;

        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::Target(format!("'{}' has no host", raw)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ConfigError::Target(format!("'{}' has no port", raw)))?;

        Ok(Self {
            scheme,
            host,
            port,
            path_prefix: url.path().to_string(),
            query: url.query().map(str::to_string),
            url,
        })
    }

    /// True when forwarded paths must be joined onto the target path.
    pub fn has_path_prefix(&self) -> bool {
        !self.path_prefix.is_empty() && self.path_prefix != "/"
    }

    /// `host:port` of the target.
    pub fn authority(&self) -> String {
        match self.url.host() {
            Some(url::Host::Ipv6(addr)) => format!("[{}]:{}", addr, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Identity this process registers under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub service_name: String,
    pub service_id: String,
    pub host: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub namespace: Option<String>,
    pub partition: Option<String>,
}

/// How the registry should probe this instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSpec {
    /// Health path without leading slash.
    pub path: String,
    pub timeout: String,
    pub interval: String,
    pub deregister_critical_after: String,
}

impl HealthCheckSpec {
    /// URL the registry probes. Always points back at this process.
    pub fn check_url(&self, identity: &InstanceIdentity) -> String {
        format!("http://{}:{}/{}", identity.host, identity.port, self.path)
    }
}

/// Validated configuration plus everything derived from it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub settings: SidecarConfig,
    pub target: TargetDescriptor,
    pub identity: InstanceIdentity,
    pub health_check: HealthCheckSpec,
}

impl SidecarConfig {
    /// Validate and derive the immutable startup values.
    ///
    /// Fails before any listener is opened when the target is unusable.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        validate_config(&self).map_err(ConfigError::Validation)?;
        let target = TargetDescriptor::parse(&self.target)?;

        let service_id = self
            .service
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.service.name, Uuid::new_v4()));

        let identity = InstanceIdentity {
            service_name: self.service.name.clone(),
            service_id,
            host: self.service.host.clone(),
            port: self.service.port,
            tags: self.service.tags.clone(),
            namespace: self.service.namespace.clone(),
            partition: self.service.partition.clone(),
        };

        let health_check = HealthCheckSpec {
            path: self.health.path.trim_start_matches('/').to_string(),
            timeout: self.health.timeout.clone(),
            interval: self.health.interval.clone(),
            deregister_critical_after: self.health.deregister_critical_after.clone(),
        };

        Ok(ResolvedConfig {
            settings: self,
            target,
            identity,
            health_check,
        })
    }
}

//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::SidecarConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    /// Target URL could not be parsed or names an unsupported scheme.
    Target(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::Target(msg) => write!(f, "Invalid target: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from a TOML file. Environment overrides are applied separately.
pub fn load_config(path: &Path) -> Result<SidecarConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Boolean parsing accepting `1/0`, `t/f` and `true/false` in upper, lower or title case.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse a JSON array of tags.
fn parse_tags(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(raw)
}

impl SidecarConfig {
    /// Apply overrides from the process environment.
    pub fn from_env(self) -> Self {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. Malformed values fall back to the
    /// current setting with a warning.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(target) = get("TARGET") {
            self.target = target;
        }
        if let Some(raw) = lookup("TRANSMIT_HEALTH") {
            self.transmit_health = parse_bool(&raw).unwrap_or(false);
        }

        if let Some(path) = get("HEALTH_PATH") {
            self.health.path = path;
        }
        self.health.path = self.health.path.trim_start_matches('/').to_string();
        if let Some(timeout) = get("HEALTH_TIMEOUT") {
            self.health.timeout = timeout;
        }
        if let Some(interval) = get("HEALTH_INTERVAL") {
            self.health.interval = interval;
        }
        if let Some(after) = get("DEREGISTER_CRITICAL_SERVICE_AFTER") {
            self.health.deregister_critical_after = after;
        }

        if let Some(name) = get("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Some(id) = get("SERVICE_ID") {
            self.service.id = Some(id);
        }
        if let Some(host) = get("SERVICE_HOST_FROM_CONSUL") {
            self.service.host = host;
        }
        if let Some(raw) = get("SERVICE_PORT") {
            match raw.parse::<u16>() {
                Ok(port) => self.service.port = port,
                Err(_) => {
                    tracing::warn!(value = %raw, "Invalid SERVICE_PORT, using 8890");
                    self.service.port = 8890;
                }
            }
        }
        if let Some(ns) = get("SERVICE_NAMESPACE") {
            self.service.namespace = Some(ns);
        }
        if let Some(partition) = get("SERVICE_PARTITION") {
            self.service.partition = Some(partition);
        }
        if let Some(raw) = get("TAGS") {
            match parse_tags(&raw) {
                Ok(tags) => self.service.tags = tags,
                Err(e) => tracing::warn!(error = %e, "Ignoring malformed TAGS"),
            }
        }
        if let Some(file) = get("TAGS_FILE") {
            self.service.tags_file = Some(file);
        }
        if let Some(file) = self.service.tags_file.clone() {
            match fs::read_to_string(&file) {
                Ok(content) => match parse_tags(&content) {
                    Ok(extra) => self.service.tags.extend(extra),
                    Err(e) => tracing::warn!(file = %file, error = %e, "Ignoring malformed tags file"),
                },
                Err(e) => tracing::warn!(file = %file, error = %e, "Cannot read tags file"),
            }
        }

        if let Some(addr) = get("CONSUL_HTTP_ADDR") {
            self.registry.address = addr;
        }
        if let Some(token) = get("CONSUL_HTTP_TOKEN") {
            self.registry.token = Some(token);
        }
        if let Some(ssl) = get("CONSUL_HTTP_SSL") {
            if parse_bool(&ssl) == Some(true) {
                self.registry.scheme = "https".to_string();
            }
        }

        let millis = |key: &str, current: u64| match get(key) {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(key, value = %raw, "Invalid millisecond value, keeping default");
                current
            }),
            None => current,
        };
        self.lifecycle.startup_grace_ms = millis("STARTUP_GRACE_MS", self.lifecycle.startup_grace_ms);
        self.lifecycle.drain_window_ms = millis("DRAIN_WINDOW_MS", self.lifecycle.drain_window_ms);
        self.lifecycle.close_timeout_ms = millis("CLOSE_TIMEOUT_MS", self.lifecycle.close_timeout_ms);

        if let Some(raw) = get("WS_APPEND_PATH") {
            self.websocket.append_request_path = parse_bool(&raw).unwrap_or(false);
        }

        if let Some(level) = get("LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(raw) = get("LOG_JSON") {
            self.observability.json_logs = parse_bool(&raw).unwrap_or(false);
        }
        if let Some(addr) = get("METRICS_ADDRESS") {
            self.observability.metrics_address = Some(addr);
        }

        self
    }
}

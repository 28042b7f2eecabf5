//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports valid, timings present)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>
//! - Target scheme is checked separately when the target is resolved

use crate::config::schema::SidecarConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.service.host.trim().is_empty() {
        errors.push(ValidationError::new("service.host", "must not be empty"));
    }
    if config.service.port == 0 {
        errors.push(ValidationError::new("service.port", "must be between 1 and 65535"));
    }
    if let Some(id) = &config.service.id {
        if id.trim().is_empty() {
            errors.push(ValidationError::new("service.id", "must not be blank when set"));
        }
    }

    for (field, value) in [
        ("health.timeout", &config.health.timeout),
        ("health.interval", &config.health.interval),
        ("health.deregister_critical_after", &config.health.deregister_critical_after),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if config.registry.address.trim().is_empty() {
        errors.push(ValidationError::new("registry.address", "must not be empty"));
    }
    if !matches!(config.registry.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "registry.scheme",
            format!("unsupported scheme '{}'", config.registry.scheme),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

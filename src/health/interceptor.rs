//! Local answering of registry health probes.
//!
//! # Responsibilities
//! - Decide per request whether the health path is answered locally
//! - Produce the synthetic success response
//!
//! # Design Decisions
//! - Pure decision: no I/O, no shared state
//! - Exact path match only; `/health/x` is forwarded
//! - With `transmit_health` the backend owns the health path entirely

use axum::{
    body::Body,
    http::{Response, StatusCode},
};

/// Routing decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Answer locally with 200 and an empty body.
    Intercept,
    /// Hand the request to the dispatcher.
    Forward,
}

/// Classifies requests against the configured health path.
#[derive(Debug, Clone)]
pub struct HealthInterceptor {
    /// Health path with exactly one leading slash.
    path: String,
    transmit_health: bool,
}

impl HealthInterceptor {
    /// Create an interceptor. Leading slashes on `path` are normalized away.
    pub fn new(path: &str, transmit_health: bool) -> Self {
        Self {
            path: format!("/{}", path.trim_start_matches('/')),
            transmit_health,
        }
    }

    /// Decide what to do with a request path.
    pub fn decide(&self, request_path: &str) -> Decision {
        if !self.transmit_health && request_path == self.path {
            Decision::Intercept
        } else {
            Decision::Forward
        }
    }

    /// The path being intercepted, with its leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Synthetic response for intercepted probes.
    pub fn response() -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        response
    }
}

//! Proxy dispatcher.
//!
//! # Responsibilities
//! - Select HTTP or WebSocket forwarding once, from the target scheme
//! - Forward every non-intercepted request to the single backend
//!
//! # Design Decisions
//! - Target resolution happens at construction, never per request
//! - No retries: a failed backend exchange is a gateway error for that caller
//! - Connections to the backend are pooled by the HTTP client

use std::net::SocketAddr;

use axum::{
    body::{Body, HttpBody},
    http::{Request, Response},
};
use reqwest::{redirect, Client};
use thiserror::Error;

use crate::config::{ResolvedConfig, TargetDescriptor};
use crate::http::request::{forward_headers, upstream_url};
use crate::http::response::{from_upstream, gateway_error};
use crate::http::websocket::WebSocketForwarder;
use crate::observability::metrics;

/// Errors raised while constructing a dispatcher.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Failed to build upstream client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Forwards plain HTTP(S) requests.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    target: TargetDescriptor,
    client: Client,
}

impl HttpForwarder {
    pub fn new(target: TargetDescriptor) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(100)
            .build()?;
        Ok(Self { target, client })
    }

    /// Forward a request and stream the backend response back.
    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        let (parts, body) = request.into_parts();
        let url = upstream_url(&self.target, &parts.uri);
        let headers = forward_headers(&parts.headers, client_addr);

        let mut upstream = self.client.request(parts.method.clone(), &url).headers(headers);
        if !body.is_end_stream() {
            upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        match upstream.send().await {
            Ok(response) => {
                tracing::debug!(
                    method = %parts.method,
                    url = %url,
                    status = %response.status(),
                    "Upstream responded"
                );
                from_upstream(response)
            }
            Err(e) => {
                tracing::warn!(method = %parts.method, url = %url, error = %e, "Upstream error");
                metrics::record_upstream_error("http");
                gateway_error(&e)
            }
        }
    }
}

/// Forwarding behavior, fixed at startup from the target scheme.
#[derive(Debug, Clone)]
pub enum Dispatcher {
    Http(HttpForwarder),
    WebSocket(WebSocketForwarder),
}

impl Dispatcher {
    /// Build the dispatcher for a resolved configuration.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, ProxyError> {
        let target = config.target.clone();
        if target.scheme.is_websocket() {
            Ok(Self::WebSocket(WebSocketForwarder::new(
                target,
                config.settings.websocket.append_request_path,
            )))
        } else {
            Ok(Self::Http(HttpForwarder::new(target)?))
        }
    }

    pub async fn forward(&self, request: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        match self {
            Self::Http(forwarder) => forwarder.forward(request, client_addr).await,
            Self::WebSocket(forwarder) => forwarder.forward(request).await,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::WebSocket(_) => "websocket",
        }
    }
}

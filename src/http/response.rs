//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Remove hop-by-hop headers
//! - Map backend errors to gateway status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Backend connection failures result in 502 Bad Gateway
//! - Backend timeouts result in 504 Gateway Timeout

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

use crate::http::request::strip_hop_by_hop;

/// Convert an upstream response into a client response without buffering.
pub fn from_upstream(upstream: reqwest::Response) -> Response<Body> {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Response for a failed upstream exchange.
pub fn gateway_error(error: &reqwest::Error) -> Response<Body> {
    if error.is_timeout() {
        (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
    } else {
        (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
    }
}

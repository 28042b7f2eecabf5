//! Request transformation for forwarding.
//!
//! # Responsibilities
//! - Join the target path prefix onto the request path
//! - Merge target and request query strings
//! - Strip hop-by-hop headers and set forwarding headers
//!
//! # Design Decisions
//! - Prefix is applied exactly once, with one slash at the seam
//! - Root targets ("/" or empty path) leave the request path untouched
//! - Inbound headers are copied, never mutated in place

use std::net::SocketAddr;

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Uri,
};

use crate::config::TargetDescriptor;

/// Headers that apply to a single transport hop and are never forwarded.
pub const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Join two path segments with exactly one slash between them.
pub fn join_path(prefix: &str, path: &str) -> String {
    match (prefix.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", prefix, &path[1..]),
        (false, false) => format!("{}/{}", prefix, path),
        _ => format!("{}{}", prefix, path),
    }
}

/// Path and query to send upstream for `uri`.
pub fn rewrite_path_and_query(target: &TargetDescriptor, uri: &Uri) -> String {
    let path = if target.has_path_prefix() {
        join_path(&target.path_prefix, uri.path())
    } else {
        uri.path().to_string()
    };

    let query = match (target.query.as_deref(), uri.query()) {
        (Some(t), Some(r)) if !t.is_empty() && !r.is_empty() => Some(format!("{}&{}", t, r)),
        (Some(t), _) if !t.is_empty() => Some(t.to_string()),
        (_, Some(r)) if !r.is_empty() => Some(r.to_string()),
        _ => None,
    };

    match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    }
}

/// Full upstream URL for `uri` against an HTTP target.
pub fn upstream_url(target: &TargetDescriptor, uri: &Uri) -> String {
    format!(
        "{}://{}{}",
        target.scheme,
        target.authority(),
        rewrite_path_and_query(target, uri)
    )
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Headers to send upstream for a client request.
///
/// The inbound `Host` is kept so virtual-host routing on the backend sees the
/// public name; only the URL points at the target.
pub fn forward_headers(original: &HeaderMap, client: Option<SocketAddr>) -> HeaderMap {
    let mut headers = original.clone();
    strip_hop_by_hop(&mut headers);

    if let Some(addr) = client {
        let ip = addr.ip().to_string();
        let value = match original.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, ip),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert("x-forwarded-for", value);
        }
    }

    headers
}

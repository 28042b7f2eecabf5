//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete upgrade handshake with client
//! - Establish WebSocket connection to backend
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Backend connection is made before the client upgrade is accepted, so an
//!   unreachable backend is reported as 502 rather than an immediate close
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions; relay ends when either side closes
//! - Request path is only joined onto the target when `append_request_path` is set

use axum::{
    body::Body,
    extract::{
        ws::{self, WebSocket, WebSocketUpgrade},
        FromRequestParts,
    },
    http::{Request, Response, StatusCode, Uri},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::{
        self,
        protocol::{frame::coding::CloseCode, CloseFrame},
    },
    MaybeTlsStream, WebSocketStream,
};

use crate::config::TargetDescriptor;
use crate::http::request::upstream_url;
use crate::observability::metrics;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Forwards WebSocket upgrades to a ws/wss target.
#[derive(Debug, Clone)]
pub struct WebSocketForwarder {
    target: TargetDescriptor,
    append_request_path: bool,
}

impl WebSocketForwarder {
    pub fn new(target: TargetDescriptor, append_request_path: bool) -> Self {
        Self {
            target,
            append_request_path,
        }
    }

    /// Backend URL for a client request.
    pub fn upstream_url(&self, uri: &Uri) -> String {
        if self.append_request_path {
            upstream_url(&self.target, uri)
        } else {
            self.target.url.to_string()
        }
    }

    /// Accept the client upgrade and relay frames to the backend.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let (mut parts, _body) = request.into_parts();
        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => return rejection.into_response(),
        };

        let url = self.upstream_url(&parts.uri);
        let upstream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "WebSocket upstream connection failed");
                metrics::record_upstream_error("websocket");
                return (StatusCode::BAD_GATEWAY, "Upstream WebSocket connection failed").into_response();
            }
        };

        tracing::debug!(url = %url, "WebSocket upstream connected");
        upgrade.on_upgrade(move |client| relay(client, upstream))
    }
}

/// Pump frames both ways until either side closes or errors.
async fn relay(client: WebSocket, upstream: UpstreamSocket) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(message)) = client_rx.next().await {
            let closing = matches!(message, ws::Message::Close(_));
            if upstream_tx.send(to_upstream(message)).await.is_err() || closing {
                break;
            }
        }
        let _ = upstream_tx.close().await;
    };

    let upstream_to_client = async {
        while let Some(Ok(message)) = upstream_rx.next().await {
            let closing = message.is_close();
            let Some(message) = to_client(message) else {
                continue;
            };
            if client_tx.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = client_tx.close().await;
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }

    tracing::debug!("WebSocket relay finished");
}

fn to_upstream(message: ws::Message) -> tungstenite::Message {
    match message {
        ws::Message::Text(text) => tungstenite::Message::Text(text.as_str().to_owned().into()),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => tungstenite::Message::Close(frame.map(|f| CloseFrame {
            code: CloseCode::from(f.code),
            reason: f.reason.as_str().to_owned().into(),
        })),
    }
}

/// Raw frames have no client-side counterpart and are dropped.
fn to_client(message: tungstenite::Message) -> Option<ws::Message> {
    let message = match message {
        tungstenite::Message::Text(text) => ws::Message::Text(text.as_str().to_owned().into()),
        tungstenite::Message::Binary(data) => ws::Message::Binary(data),
        tungstenite::Message::Ping(data) => ws::Message::Ping(data),
        tungstenite::Message::Pong(data) => ws::Message::Pong(data),
        tungstenite::Message::Close(frame) => ws::Message::Close(frame.map(|f| ws::CloseFrame {
            code: u16::from(f.code),
            reason: f.reason.as_str().to_owned().into(),
        })),
        tungstenite::Message::Frame(_) => return None,
    };
    Some(message)
}

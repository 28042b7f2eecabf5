//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, health interception, in-flight tracking)
//!     → dispatch.rs (HTTP or WebSocket, fixed at startup)
//!     → request.rs (path prefix rewrite, hop-by-hop stripping, X-Forwarded-For)
//!     → backend
//!     → response.rs (stream back, strip hop-by-hop, map errors to 502/504)
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use dispatch::{Dispatcher, HttpForwarder, ProxyError};
pub use server::{CloseError, HttpServer, ServerHandle};
pub use websocket::WebSocketForwarder;

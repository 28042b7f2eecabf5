//! TCP listener binding and listener lifecycle events.
//!
//! # Responsibilities
//! - Bind to the configured interface on the service port
//! - Report bind outcome and runtime failures to the orchestrator

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// Accept loop failed after startup.
    #[error("Listener failed: {0}")]
    Serve(#[source] std::io::Error),
    /// No bind outcome within the startup grace window.
    #[error("Listener not ready within {0:?}")]
    NotReady(Duration),
    /// Serving task ended without being asked to close.
    #[error("Listener exited unexpectedly")]
    Exited,
}

/// Events the serving task reports to the orchestrator.
#[derive(Debug)]
pub enum ListenerEvent {
    /// Socket is bound and the accept loop is running.
    Bound(SocketAddr),
    /// Binding or serving failed.
    Failed(ListenerError),
    /// Accept loop returned after a close request.
    Stopped,
}

/// Bind a TCP listener on `host:port`.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ListenerError::Bind { addr: addr.clone(), source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_conflict_reported() {
        let first = bind("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = bind("127.0.0.1", port).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }
}

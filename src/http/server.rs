//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Answer health probes locally when configured
//! - Dispatch everything else to the backend
//! - Run the accept loop in its own task and report its lifecycle

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ResolvedConfig;
use crate::health::{Decision, HealthInterceptor};
use crate::http::dispatch::{Dispatcher, ProxyError};
use crate::lifecycle::Shutdown;
use crate::net::listener::{self, ListenerError, ListenerEvent};
use crate::net::InFlightTracker;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub interceptor: Arc<HealthInterceptor>,
    pub dispatcher: Arc<Dispatcher>,
    pub in_flight: InFlightTracker,
}

/// HTTP server for the sidecar.
pub struct HttpServer {
    router: Router,
    bind_host: String,
    port: u16,
    in_flight: InFlightTracker,
}

impl HttpServer {
    /// Create a new HTTP server. Fails if the dispatcher cannot be built.
    pub fn new(config: &ResolvedConfig) -> Result<Self, ProxyError> {
        let dispatcher = Dispatcher::from_config(config)?;
        let interceptor = HealthInterceptor::new(&config.health_check.path, config.settings.transmit_health);
        let in_flight = InFlightTracker::new();

        tracing::info!(
            target_url = %config.target.url,
            dispatcher = dispatcher.kind(),
            health_path = %interceptor.path(),
            transmit_health = config.settings.transmit_health,
            "Proxy configured"
        );

        let state = AppState {
            interceptor: Arc::new(interceptor),
            dispatcher: Arc::new(dispatcher),
            in_flight: in_flight.clone(),
        };

        Ok(Self {
            router: Self::build_router(state),
            bind_host: config.settings.listener.bind_host.clone(),
            port: config.identity.port,
            in_flight,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind and serve in a background task.
    ///
    /// Returns immediately; the bind outcome arrives as the first event on the handle.
    pub fn spawn(self) -> ServerHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let close = Shutdown::new();
        let mut close_signal = close.subscribe();
        let HttpServer {
            router,
            bind_host,
            port,
            in_flight,
        } = self;

        let task = tokio::spawn(async move {
            let listener = match listener::bind(&bind_host, port).await {
                Ok(listener) => listener,
                Err(e) => {
                    let _ = events_tx.send(ListenerEvent::Failed(e));
                    return;
                }
            };
            let local_addr = match listener.local_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    let _ = events_tx.send(ListenerEvent::Failed(ListenerError::Serve(e)));
                    return;
                }
            };

            let _ = events_tx.send(ListenerEvent::Bound(local_addr));
            tracing::info!(address = %local_addr, "HTTP server accepting connections");

            let app = router.into_make_service_with_connect_info::<SocketAddr>();
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { close_signal.recv().await })
                .await;

            match served {
                Ok(()) => {
                    tracing::info!("HTTP server stopped");
                    let _ = events_tx.send(ListenerEvent::Stopped);
                }
                Err(e) => {
                    tracing::error!(error = %e, "HTTP server failed");
                    let _ = events_tx.send(ListenerEvent::Failed(ListenerError::Serve(e)));
                }
            }
        });

        ServerHandle {
            events: events_rx,
            close,
            task,
            in_flight,
        }
    }
}

/// Errors observed while closing the listener.
#[derive(Debug, Error)]
pub enum CloseError {
    #[error("Listener did not close within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("Listener task aborted: {0}")]
    Join(String),
}

/// Control handle for a spawned server.
pub struct ServerHandle {
    events: mpsc::UnboundedReceiver<ListenerEvent>,
    close: Shutdown,
    task: JoinHandle<()>,
    in_flight: InFlightTracker,
}

impl ServerHandle {
    /// Next lifecycle event from the serving task. `None` once the task is gone.
    pub async fn next_event(&mut self) -> Option<ListenerEvent> {
        self.events.recv().await
    }

    /// Requests currently being served.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.active_count()
    }

    /// Kills the serving task without a close request.
    #[cfg(test)]
    pub(crate) fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }

    /// Stop accepting connections and let in-flight ones finish.
    pub fn close(&self) {
        self.close.trigger();
    }

    /// Close and wait for the accept loop to finish, up to `timeout`.
    ///
    /// The task is aborted if it does not finish in time.
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<(), CloseError> {
        self.close();

        let waited = tokio::time::timeout(timeout, async {
            loop {
                match self.events.recv().await {
                    Some(ListenerEvent::Stopped) => return Ok(()),
                    Some(ListenerEvent::Failed(e)) => return Err(CloseError::Listener(e)),
                    Some(ListenerEvent::Bound(_)) => continue,
                    None => {
                        return (&mut self.task)
                            .await
                            .map_err(|e| CloseError::Join(e.to_string()));
                    }
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => {
                self.task.abort();
                Err(CloseError::TimedOut(timeout))
            }
        }
    }
}

/// Main proxy handler.
/// Answers the health path locally or forwards to the backend.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let _guard = state.in_flight.track();

    if state.interceptor.decide(request.uri().path()) == Decision::Intercept {
        metrics::record_health_intercepted();
        return HealthInterceptor::response();
    }

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    tracing::debug!(
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );

    metrics::record_forwarded(state.dispatcher.kind());
    state.dispatcher.forward(request, client_addr).await
}

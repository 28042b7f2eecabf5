//! Lifecycle orchestrator.
//!
//! # Responsibilities
//! - Resolve configuration and build the proxy before any socket is opened
//! - Confirm the listener is live before registering
//! - Deregister before the listener closes, then drain and close
//! - Classify failures into process exit codes
//!
//! # Design Decisions
//! - One control task owns the state and the registration ticket
//! - A listener crash is fatal; it is never restarted
//! - Deregistration errors are logged only; the registry's critical-check
//!   auto-deregistration covers them

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ConfigError, InstanceIdentity, ResolvedConfig, SidecarConfig};
use crate::http::dispatch::ProxyError;
use crate::http::server::{CloseError, HttpServer, ServerHandle};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::lifecycle::state::{LifecycleState, RegistrationTicket};
use crate::net::{ListenerError, ListenerEvent};
use crate::observability::metrics;
use crate::registry::{RegistryClient, RegistryError, RegistrySession};

/// Fatal lifecycle failures.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to build proxy: {0}")]
    Proxy(#[from] ProxyError),
    #[error("Listener failed to start: {0}")]
    ListenerStartup(#[source] ListenerError),
    #[error("Service registration failed: {0}")]
    Registration(#[source] RegistryError),
    #[error("Listener failed while serving: {0}")]
    ListenerRuntime(#[source] ListenerError),
    #[error("Failed to close listener: {0}")]
    Close(#[from] CloseError),
}

impl LifecycleError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::Close(_) => 2,
            _ => 1,
        }
    }
}

/// Result of a full lifecycle run.
#[derive(Debug)]
pub struct Outcome {
    pub final_state: LifecycleState,
    /// Every state entered, in order, starting with `Starting`.
    pub history: Vec<LifecycleState>,
    pub error: Option<LifecycleError>,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, LifecycleError::exit_code)
    }
}

/// Drives the sidecar from startup to exit.
pub struct Orchestrator {
    config: SidecarConfig,
    registry: Arc<dyn RegistryClient>,
    shutdown: ShutdownSignal,
    state: LifecycleState,
    history: Vec<LifecycleState>,
    ticket: RegistrationTicket,
}

impl Orchestrator {
    pub fn new(config: SidecarConfig, registry: Arc<dyn RegistryClient>, shutdown: ShutdownSignal) -> Self {
        metrics::record_lifecycle_state(LifecycleState::Starting.ordinal());
        Self {
            config,
            registry,
            shutdown,
            state: LifecycleState::Starting,
            history: vec![LifecycleState::Starting],
            ticket: RegistrationTicket::new(),
        }
    }

    /// Run to a terminal state.
    pub async fn run(mut self) -> Outcome {
        let result = self.drive().await;
        self.finish(result)
    }

    fn finish(mut self, result: Result<(), LifecycleError>) -> Outcome {
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(error = %e, state = %self.state, "Sidecar failed");
                self.transition(LifecycleState::Failed);
                Some(e)
            }
        };

        Outcome {
            final_state: self.state,
            history: self.history,
            error,
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Ignoring illegal lifecycle transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
        self.history.push(next);
        metrics::record_lifecycle_state(next.ordinal());
    }

    async fn drive(&mut self) -> Result<(), LifecycleError> {
        let resolved = self.config.clone().resolve()?;
        let server = HttpServer::new(&resolved)?;

        let handle = server.spawn();
        self.transition(LifecycleState::Serving);
        self.supervise(&resolved, handle).await
    }

    /// Everything after the listener task has been spawned.
    async fn supervise(&mut self, resolved: &ResolvedConfig, mut handle: ServerHandle) -> Result<(), LifecycleError> {
        let lifecycle = resolved.settings.lifecycle.clone();

        if let Err(e) = await_bound(&mut handle, lifecycle.startup_grace()).await {
            abort_listener(&mut handle, resolved).await;
            return Err(LifecycleError::ListenerStartup(e));
        }

        if self.shutdown.is_triggered() {
            tracing::info!("Shutdown requested before registration, skipping registry");
            self.transition(LifecycleState::ShuttingDown);
            handle.shutdown(lifecycle.close_timeout()).await?;
            self.transition(LifecycleState::Stopped);
            return Ok(());
        }

        self.transition(LifecycleState::Registering);
        let session = RegistrySession::new(Arc::clone(&self.registry));
        let identity = &resolved.identity;

        if let Err(e) = session.register(identity, &resolved.health_check).await {
            abort_listener(&mut handle, resolved).await;
            return Err(LifecycleError::Registration(e));
        }
        self.ticket.issue();
        tracing::info!(service_id = %identity.service_id, "Service registered");

        match session.reap_duplicates(identity).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Removed stale registrations"),
            Err(e) => tracing::warn!(error = %e, "Failed to reap stale registrations"),
        }

        self.transition(LifecycleState::Running);

        let runtime_failure = tokio::select! {
            _ = self.shutdown.recv() => None,
            failure = next_failure(&mut handle) => Some(failure),
        };

        self.transition(LifecycleState::Deregistering);
        self.deregister_once(&session, identity).await;

        if runtime_failure.is_none() {
            let window = lifecycle.drain_window();
            tracing::info!(
                drain_ms = window.as_millis() as u64,
                in_flight = handle.in_flight(),
                "Draining before close"
            );
            tokio::time::sleep(window).await;
        }

        self.transition(LifecycleState::ShuttingDown);
        tracing::info!(in_flight = handle.in_flight(), "Closing listener");
        let closed = handle.shutdown(lifecycle.close_timeout()).await;

        if let Some(e) = runtime_failure {
            if let Err(close_err) = closed {
                tracing::warn!(error = %close_err, "Listener close after crash reported an error");
            }
            return Err(LifecycleError::ListenerRuntime(e));
        }
        closed?;

        self.transition(LifecycleState::Stopped);
        tracing::info!("Sidecar stopped");
        Ok(())
    }

    /// Deregister if the ticket is held. Safe to call more than once.
    async fn deregister_once(&mut self, session: &RegistrySession, identity: &InstanceIdentity) {
        if !self.ticket.take() {
            tracing::debug!("No registration held, skipping deregistration");
            return;
        }
        match session.deregister(identity).await {
            Ok(()) => tracing::info!(service_id = %identity.service_id, "Service deregistered"),
            Err(e) => tracing::warn!(
                service_id = %identity.service_id,
                error = %e,
                "Deregistration failed, relying on registry auto-deregistration"
            ),
        }
    }
}

/// Wait for the listener's bind outcome.
async fn await_bound(handle: &mut ServerHandle, grace: std::time::Duration) -> Result<(), ListenerError> {
    match tokio::time::timeout(grace, handle.next_event()).await {
        Ok(Some(ListenerEvent::Bound(addr))) => {
            tracing::info!(address = %addr, "Listener confirmed");
            Ok(())
        }
        Ok(Some(ListenerEvent::Failed(e))) => Err(e),
        Ok(Some(ListenerEvent::Stopped)) | Ok(None) => Err(ListenerError::Exited),
        Err(_) => Err(ListenerError::NotReady(grace)),
    }
}

/// Resolves when the listener fails or stops on its own.
async fn next_failure(handle: &mut ServerHandle) -> ListenerError {
    loop {
        match handle.next_event().await {
            Some(ListenerEvent::Bound(_)) => continue,
            Some(ListenerEvent::Failed(e)) => return e,
            Some(ListenerEvent::Stopped) | None => return ListenerError::Exited,
        }
    }
}

/// Best-effort close on a startup failure path.
async fn abort_listener(handle: &mut ServerHandle, resolved: &ResolvedConfig) {
    if let Err(e) = handle.shutdown(resolved.settings.lifecycle.close_timeout()).await {
        tracing::warn!(error = %e, "Listener did not close cleanly during startup abort");
    }
}

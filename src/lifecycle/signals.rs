//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate signals into the shutdown token
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Only the first signal triggers shutdown; repeats are logged and ignored
//! - The orchestrator waits on the token, never on the OS primitive

use crate::lifecycle::shutdown::Shutdown;

/// Spawn a task that triggers `shutdown` on SIGINT/SIGTERM.
pub fn listen(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let name = match wait_for_signal().await {
                Ok(name) => name,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

            if shutdown.trigger() {
                tracing::info!(signal = name, "Shutdown signal received");
            } else {
                tracing::info!(signal = name, "Shutdown already in progress, ignoring signal");
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = interrupt.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation token shared by signal handling, the orchestrator and the server.
///
/// Triggering is one-way: the first `trigger` flips the token, later calls are
/// no-ops. Subscribers created after the trigger still observe it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal. Returns true only for the first trigger.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| {
            if *triggered {
                false
            } else {
                *triggered = true;
                true
            }
        })
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered.
    ///
    /// Never resolves if every [`Shutdown`] handle is dropped untriggered.
    pub async fn recv(&mut self) {
        let closed = self.rx.wait_for(|triggered| *triggered).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }

    /// Whether the signal has fired.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

//! Lifecycle state machine.

use std::fmt;

/// Process lifecycle phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Starting,
    Serving,
    Registering,
    Running,
    Deregistering,
    ShuttingDown,
    Stopped,
    Failed,
}

impl LifecycleState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Starting, Serving)
                | (Starting, Failed)
                | (Serving, Registering)
                | (Serving, Failed)
                | (Registering, Running)
                | (Registering, Failed)
                // shutdown requested before registration completed
                | (Serving, ShuttingDown)
                | (Running, Deregistering)
                | (Deregistering, ShuttingDown)
                | (ShuttingDown, Stopped)
                | (ShuttingDown, Failed)
        )
    }

    /// Numeric value exported on the lifecycle gauge.
    pub fn ordinal(self) -> u8 {
        match self {
            LifecycleState::Starting => 0,
            LifecycleState::Serving => 1,
            LifecycleState::Registering => 2,
            LifecycleState::Running => 3,
            LifecycleState::Deregistering => 4,
            LifecycleState::ShuttingDown => 5,
            LifecycleState::Stopped => 6,
            LifecycleState::Failed => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Serving => "serving",
            LifecycleState::Registering => "registering",
            LifecycleState::Running => "running",
            LifecycleState::Deregistering => "deregistering",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records whether this process currently owns a registry entry.
///
/// Issued after a successful registration. Deregistration consumes it, so a
/// second shutdown path finds nothing to remove.
#[derive(Debug, Default)]
pub struct RegistrationTicket {
    held: bool,
}

impl RegistrationTicket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) {
        self.held = true;
    }

    /// Clear the ticket. Returns true if it was held.
    pub fn take(&mut self) -> bool {
        std::mem::replace(&mut self.held, false)
    }
}

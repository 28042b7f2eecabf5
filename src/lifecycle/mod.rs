//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Resolve config → Build dispatcher → Spawn listener → Wait for Bound
//!     → Register → Reap duplicates → Running
//!
//! Shutdown (orchestrator.rs):
//!     Token fired or listener crashed → Deregister → Drain → Close → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown.rs token (first signal only)
//! ```
//!
//! # Design Decisions
//! - Registration happens only after the listener reports it is bound
//! - Deregistration happens before the listener closes
//! - Shutdown has timeout: a listener that will not close yields exit code 2

pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use orchestrator::{LifecycleError, Orchestrator, Outcome};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::{LifecycleState, RegistrationTicket};

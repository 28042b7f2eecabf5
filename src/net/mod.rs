//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, report Bound/Failed/Stopped)
//!     → connection.rs (in-flight request tracking for drain)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bind outcome is reported as an event, never by panicking the serving task
//! - In-flight requests are counted so drain progress can be logged

pub mod connection;
pub mod listener;

pub use connection::{InFlightGuard, InFlightTracker};
pub use listener::{ListenerError, ListenerEvent};

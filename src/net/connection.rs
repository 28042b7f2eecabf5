//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served
//! - Let shutdown report how much work is still draining

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Tracks in-flight requests for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    active_count: Arc<AtomicU64>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        let now = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_in_flight(now);
        InFlightGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    /// Current in-flight request count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a request's lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let now = self.active_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::record_in_flight(now);
    }
}

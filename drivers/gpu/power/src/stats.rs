//! # Power Statistics
//!
//! Counters kept outside the state lock so they can be read from any
//! context, including while a transition is running.

use core::sync::atomic::{AtomicU64, Ordering};

/// Power controller statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerStats {
    /// Completed state changes
    pub transitions: u64,
    /// Broadcast requests dropped on lock or gate contention
    pub dropped_broadcasts: u64,
    /// Requests aborted with `NotReady`
    pub not_ready: u64,
    /// Timer expiries that had been superseded
    pub stale_timeouts: u64,
    /// Requests that failed with a fatal error
    pub failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PowerCounters {
    transitions: AtomicU64,
    dropped_broadcasts: AtomicU64,
    not_ready: AtomicU64,
    stale_timeouts: AtomicU64,
    failures: AtomicU64,
}

impl PowerCounters {
    pub fn transition(&self) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_broadcast(&self) {
        self.dropped_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_timeout(&self) {
        self.stale_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PowerStats {
        PowerStats {
            transitions: self.transitions.load(Ordering::Relaxed),
            dropped_broadcasts: self.dropped_broadcasts.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
            stale_timeouts: self.stale_timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

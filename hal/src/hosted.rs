//! # Hosted OS Services
//!
//! `std`-backed implementations of [`Platform`] and [`OneShotTimer`], used
//! when the power controller runs as a hosted process (simulators, tests).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use core::time::Duration;

use crate::error::{Error, Result};
use crate::os::{OneShotTimer, Platform, TimerCallback};

// =============================================================================
// PLATFORM
// =============================================================================

/// Monotonic clock anchored at construction, delays via `thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct StdPlatform {
    origin: Instant,
}

impl StdPlatform {
    /// Create a platform whose clock starts now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for StdPlatform {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

// =============================================================================
// THREAD TIMER
// =============================================================================

/// One-shot timer backed by a sleeper thread per arming
///
/// Every start or stop bumps an epoch. A sleeper only runs its callback if
/// the epoch it was armed with is still current when it wakes up.
#[derive(Debug, Default)]
pub struct ThreadTimer {
    epoch: Arc<AtomicU64>,
}

impl ThreadTimer {
    /// Create an idle timer
    pub fn new() -> Self {
        Self::default()
    }
}

impl OneShotTimer for ThreadTimer {
    fn start(&self, after: Duration, on_expiry: TimerCallback) -> Result<()> {
        let armed = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let epoch = Arc::clone(&self.epoch);

        thread::Builder::new()
            .name("gpu-power-timer".into())
            .spawn(move || {
                thread::sleep(after);
                if epoch.load(Ordering::Acquire) == armed {
                    on_expiry();
                } else {
                    log::trace!("gpu timer: arming {} superseded", armed);
                }
            })
            .map(|_| ())
            .map_err(|err| {
                log::error!("gpu timer: cannot spawn sleeper: {}", err);
                Error::TimerFailed
            })
    }

    fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

// =============================================================================
// TESTS
// =============================================================================

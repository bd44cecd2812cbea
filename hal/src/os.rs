//! # OS Services
//!
//! Time and timer services the power controller needs from its host kernel.

use alloc::boxed::Box;
use core::time::Duration;

use crate::error::Result;

/// Callback invoked once when a one-shot timer expires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Monotonic clock and thread delay
pub trait Platform: Send + Sync {
    /// Monotonic time since an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Put the calling thread to sleep
    fn delay(&self, duration: Duration);
}

/// A restartable single-shot timer
pub trait OneShotTimer: Send + Sync {
    /// (Re)start the timer. A pending expiry from an earlier start is
    /// discarded where possible.
    fn start(&self, after: Duration, on_expiry: TimerCallback) -> Result<()>;

    /// Stop the timer. An expiry that is already running is not waited for.
    fn stop(&self);
}

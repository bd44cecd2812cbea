//! # Collaborator Ports
//!
//! Call-level contracts for the hardware pieces the power controller drives
//! but does not own. All ports are shared across threads; the power
//! controller serializes its own calls under its state lock.

use crate::error::Result;

// =============================================================================
// REGISTER PORT
// =============================================================================

/// Synchronous access to the core's registers
///
/// The port is not independently synchronized. Callers that program a
/// sequence of registers must serialize among themselves.
pub trait RegisterPort: Send + Sync {
    /// Read a 32-bit register
    fn read(&self, offset: u32) -> Result<u32>;

    /// Write a 32-bit register
    fn write(&self, offset: u32, value: u32) -> Result<()>;
}

// =============================================================================
// POWER RAIL
// =============================================================================

/// Switch for the core's clock and voltage rail
pub trait PowerRail: Send + Sync {
    /// Drive the clock and the rail to the given status
    fn set_power(&self, clock_on: bool, rail_on: bool) -> Result<()>;
}

// =============================================================================
// COMMAND QUEUE
// =============================================================================

/// The GPU instruction stream
pub trait CommandQueue: Send + Sync {
    /// Start fetching commands
    fn start(&self) -> Result<()>;

    /// Stop fetching commands
    fn stop(&self) -> Result<()>;

    /// Wait for queued work to be consumed
    ///
    /// A non-blocking stall returns [`Error::NotReady`](crate::Error::NotReady)
    /// when work is still outstanding.
    fn stall(&self, blocking: bool) -> Result<()>;

    /// Commits currently between validation and hand-off to the queue
    fn in_flight_commits(&self) -> i32;
}

// =============================================================================
// BRING-UP, CACHES, IDLE
// =============================================================================

/// Full register reprogramming after the core lost power
pub trait HardwareBringup: Send + Sync {
    /// Reprogram the core. Idempotent.
    fn reinitialize(&self) -> Result<()>;
}

/// GPU cache maintenance
pub trait CacheFlush: Send + Sync {
    /// Flush and invalidate the GPU caches. The clock must be running.
    fn flush_caches(&self) -> Result<()>;
}

/// Pipeline quiescence query
pub trait IdleQuery: Send + Sync {
    /// Whether all pipeline stages report idle
    fn is_idle(&self, blocking: bool) -> Result<bool>;
}

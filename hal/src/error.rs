//! # GPU Power Error Handling
//!
//! Error types shared by the hardware ports and the power controller.
//!
//! Error handling follows these principles:
//! - Errors are typed and `Copy`, so they cross lock boundaries freely
//! - `NotReady` is a transient condition, not a failure
//! - Register faults carry the offending offset for debugging
//! - Errors are `no_std` compatible

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// GPU power Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// Unified error type for the GPU power stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A gate or lock is busy, a commit is in flight, or the hardware is not
    /// idle yet. Callers retry later or drop the attempt.
    NotReady,
    /// Malformed request (e.g. a raw power state outside the known range)
    InvalidArgument,
    /// An internal invariant of the power state machine was violated
    InvalidState,
    /// The liveness signature did not match within the liveness timeout
    DeviceNotResponding,
    /// The idle wait exceeded its bound
    Timeout,
    /// Register port failure
    Io(RegisterFault),
    /// The OS timer could not be armed
    TimerFailed,
}

impl Error {
    /// Whether the condition is transient and should not be reported as an error
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady)
    }

    /// Whether the condition should be escalated to device recovery
    pub const fn needs_recovery(&self) -> bool {
        matches!(self, Self::DeviceNotResponding | Self::Timeout | Self::Io(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "hardware not ready"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::InvalidState => write!(f, "power state invariant violated"),
            Self::DeviceNotResponding => write!(f, "GPU not responding"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::Io(fault) => write!(f, "register I/O error: {}", fault),
            Self::TimerFailed => write!(f, "timer could not be armed"),
        }
    }
}

// =============================================================================
// REGISTER FAULTS
// =============================================================================

/// Direction of a failed register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Register read
    Read,
    /// Register write
    Write,
}

/// A failed register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFault {
    /// Register offset from the core's register base
    pub offset: u32,
    /// Access direction
    pub access: Access,
}

impl RegisterFault {
    /// Fault on a read of `offset`
    pub const fn read(offset: u32) -> Self {
        Self {
            offset,
            access: Access::Read,
        }
    }

    /// Fault on a write of `offset`
    pub const fn write(offset: u32) -> Self {
        Self {
            offset,
            access: Access::Write,
        }
    }
}

impl fmt::Display for RegisterFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.access {
            Access::Read => "read",
            Access::Write => "write",
        };
        write!(f, "{} at {:#07x}", dir, self.offset)
    }
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<RegisterFault> for Error {
    fn from(fault: RegisterFault) -> Self {
        Error::Io(fault)
    }
}

// =============================================================================
// TESTS
// =============================================================================

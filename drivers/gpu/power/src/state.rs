//! # Power States and Requests
//!
//! The four power states of a GPU core, ordered by severity, and the request
//! type callers hand to the controller.

use core::fmt;

use helix_gpu_hal::{ClockProfile, Error, Result};

// =============================================================================
// POWER STATE
// =============================================================================

/// Power state of a GPU core
///
/// Ordering is severity: a greater state is more powered-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum PowerState {
    /// Clocked at full speed, command queue running
    On      = 0,
    /// Clock scaled down, queue running, rail on
    Idle    = 1,
    /// Clock off, rail on, queue stopped
    Suspend = 2,
    /// Clock and rail off
    Off     = 3,
}

impl PowerState {
    /// All states, least severe first
    pub const ALL: [PowerState; 4] = [
        PowerState::On,
        PowerState::Idle,
        PowerState::Suspend,
        PowerState::Off,
    ];

    /// Severity index (0 = ON, 3 = OFF)
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The next more powered-down state
    pub const fn deeper(self) -> Option<Self> {
        match self {
            Self::On => Some(Self::Idle),
            Self::Idle => Some(Self::Suspend),
            Self::Suspend => Some(Self::Off),
            Self::Off => None,
        }
    }

    /// The next more powered-up state
    pub const fn shallower(self) -> Option<Self> {
        match self {
            Self::On => None,
            Self::Idle => Some(Self::On),
            Self::Suspend => Some(Self::Idle),
            Self::Off => Some(Self::Suspend),
        }
    }

    /// Clock profile programmed for this state
    pub const fn clock_profile(self) -> ClockProfile {
        match self {
            Self::On => ClockProfile::FULL,
            Self::Idle => ClockProfile::IDLE,
            Self::Suspend => ClockProfile::SUSPEND,
            Self::Off => ClockProfile::OFF,
        }
    }
}

impl TryFrom<u32> for PowerState {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::On),
            1 => Ok(Self::Idle),
            2 => Ok(Self::Suspend),
            3 => Ok(Self::Off),
            _ => Err(Error::InvalidArgument),
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::On => "ON",
            Self::Idle => "IDLE",
            Self::Suspend => "SUSPEND",
            Self::Off => "OFF",
        };
        f.write_str(name)
    }
}

// =============================================================================
// REQUEST MODE
// =============================================================================

/// Identifies one arming of the delayed power-off timer
///
/// Only the controller mints tickets, so only the timer can produce
/// timeout requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutTicket(pub(crate) u64);

/// How a request was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Caller-forced; blocks until it can execute and sets the global state
    Explicit,
    /// Opportunistic power-up for an upcoming operation; yields to any
    /// global non-ON state
    Auto,
    /// Best effort; never blocks and silently drops on contention
    Broadcast,
    /// Broadcast issued by the delayed power-off timer
    Timeout(TimeoutTicket),
}

/// Arbitration class derived from the request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Explicit request
    Global,
    /// Opportunistic power-up
    Auto,
    /// Broadcast or timeout request
    Broadcast,
}

// =============================================================================
// POWER REQUEST
// =============================================================================

/// A power-state request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerRequest {
    target: PowerState,
    mode: RequestMode,
}

impl PowerRequest {
    /// Explicit request for `target`
    pub const fn explicit(target: PowerState) -> Self {
        Self {
            target,
            mode: RequestMode::Explicit,
        }
    }

    /// Opportunistic power-up (ON_AUTO)
    pub const fn auto() -> Self {
        Self {
            target: PowerState::On,
            mode: RequestMode::Auto,
        }
    }

    /// Best-effort request for `target`
    pub const fn broadcast(target: PowerState) -> Self {
        Self {
            target,
            mode: RequestMode::Broadcast,
        }
    }

    pub(crate) const fn timeout(target: PowerState, ticket: TimeoutTicket) -> Self {
        Self {
            target,
            mode: RequestMode::Timeout(ticket),
        }
    }

    /// Build a request from a raw state value
    ///
    /// Fails with [`Error::InvalidArgument`] for values outside the four
    /// base states.
    pub fn from_raw(raw: u32, mode: RequestMode) -> Result<Self> {
        let target = PowerState::try_from(raw)?;
        if mode == RequestMode::Auto && target != PowerState::On {
            return Err(Error::InvalidArgument);
        }
        Ok(Self { target, mode })
    }

    /// Target state
    pub const fn target(&self) -> PowerState {
        self.target
    }

    /// Request mode
    pub const fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Arbitration class
    pub const fn class(&self) -> RequestClass {
        match self.mode {
            RequestMode::Explicit => RequestClass::Global,
            RequestMode::Auto => RequestClass::Auto,
            RequestMode::Broadcast | RequestMode::Timeout(_) => RequestClass::Broadcast,
        }
    }

    /// Whether the request must never block
    pub const fn is_broadcast(&self) -> bool {
        matches!(self.class(), RequestClass::Broadcast)
    }

    /// Whether the request sets the global state
    pub const fn is_global(&self) -> bool {
        matches!(self.class(), RequestClass::Global)
    }
}

impl fmt::Display for PowerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            RequestMode::Explicit => write!(f, "{}", self.target),
            RequestMode::Auto => write!(f, "{}_AUTO", self.target),
            RequestMode::Broadcast => write!(f, "{}_BROADCAST", self.target),
            RequestMode::Timeout(ticket) => write!(f, "{}_TIMEOUT#{}", self.target, ticket.0),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_severity_order() {
        assert!(PowerState::On < PowerState::Idle);
        assert!(PowerState::Idle < PowerState::Suspend);
        assert!(PowerState::Suspend < PowerState::Off);
    }

    #[test]
    fn test_walk_is_symmetric() {
        for state in PowerState::ALL {
            if let Some(deeper) = state.deeper() {
                assert_eq!(deeper.shallower(), Some(state));
            }
        }
        assert_eq!(PowerState::On.shallower(), None);
        assert_eq!(PowerState::Off.deeper(), None);
    }

    #[test]
    fn test_raw_state_validation() {
        assert_eq!(PowerState::try_from(2), Ok(PowerState::Suspend));
        assert_eq!(PowerState::try_from(4), Err(Error::InvalidArgument));
        assert_eq!(
            PowerRequest::from_raw(7, RequestMode::Explicit),
            Err(Error::InvalidArgument)
        );
    }

    #[test]
    fn test_auto_must_target_on() {
        assert_eq!(
            PowerRequest::from_raw(1, RequestMode::Auto),
            Err(Error::InvalidArgument)
        );
        assert_eq!(
            PowerRequest::from_raw(0, RequestMode::Auto),
            Ok(PowerRequest::auto())
        );
    }

    #[test]
    fn test_classification() {
        assert!(PowerRequest::explicit(PowerState::Off).is_global());
        assert_eq!(PowerRequest::auto().class(), RequestClass::Auto);
        assert!(PowerRequest::broadcast(PowerState::Idle).is_broadcast());
        let timeout = PowerRequest::timeout(PowerState::Off, TimeoutTicket(3));
        assert!(timeout.is_broadcast());
        assert!(!timeout.is_global());
    }

    #[test]
    fn test_request_display() {
        assert_eq!(PowerRequest::auto().to_string(), "ON_AUTO");
        assert_eq!(
            PowerRequest::broadcast(PowerState::Suspend).to_string(),
            "SUSPEND_BROADCAST"
        );
    }
}

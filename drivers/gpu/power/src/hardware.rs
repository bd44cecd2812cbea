//! # Core Hardware Bundle
//!
//! The collaborator ports of one GPU core, handed to the controller at
//! construction. The controller keeps them behind its state lock, which is
//! what serializes register programming for the core.

use alloc::sync::Arc;
use core::fmt;

use helix_gpu_hal::{CacheFlush, CommandQueue, HardwareBringup, IdleQuery, PowerRail, RegisterPort};

use crate::state::PowerState;

/// Ports of one GPU core
#[derive(Clone)]
pub struct CoreHardware {
    /// Register access
    pub registers: Arc<dyn RegisterPort>,
    /// Clock and rail switch
    pub rail: Arc<dyn PowerRail>,
    /// Instruction stream
    pub queue: Arc<dyn CommandQueue>,
    /// Full reprogramming after power loss
    pub bringup: Arc<dyn HardwareBringup>,
    /// Cache maintenance
    pub caches: Arc<dyn CacheFlush>,
    /// Pipeline quiescence
    pub idle: Arc<dyn IdleQuery>,
}

impl fmt::Debug for CoreHardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreHardware").finish_non_exhaustive()
    }
}

/// Last known status of the clock and the voltage rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RailStatus {
    /// Clock running
    pub clock: bool,
    /// Rail powered
    pub power: bool,
}

impl RailStatus {
    /// Clock and rail on
    pub const ON: Self = Self {
        clock: true,
        power: true,
    };

    /// Status a core settled in `state` keeps its rails in
    pub const fn of(state: PowerState) -> Self {
        match state {
            PowerState::On | PowerState::Idle => Self::ON,
            PowerState::Suspend => Self {
                clock: false,
                power: true,
            },
            PowerState::Off => Self {
                clock: false,
                power: false,
            },
        }
    }

    /// Whether registers can be programmed
    pub const fn is_live(&self) -> bool {
        self.clock && self.power
    }
}

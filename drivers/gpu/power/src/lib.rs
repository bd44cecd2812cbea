//! # Helix GPU Power State Controller
//!
//! Moves a GPU core between four power states, ordered by severity:
//!
//! | State   | Clock      | Rail | Command queue |
//! |---------|------------|------|---------------|
//! | ON      | full speed | on   | running       |
//! | IDLE    | scaled     | on   | running       |
//! | SUSPEND | off        | on   | stopped       |
//! | OFF     | off        | off  | stopped       |
//!
//! Requests come in three flavours: explicit requests set the global state
//! and block until they can run, auto requests wake the core for an upcoming
//! operation unless a global non-ON state is in force, and broadcast
//! requests are best effort and never block. A one-shot timer powers an
//! IDLE or SUSPEND core off after a grace period.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       PowerController                          │
//! │  state lock ─ cross-core gate ─ submission gate ─ state timer  │
//! └───────┬───────────────────────┬──────────────────────┬─────────┘
//!         │                       │                      │
//!  ┌──────▼───────┐       ┌───────▼───────┐      ┌───────▼────────┐
//!  │  Transition  │       │   PowerOff    │      │ SubmissionGate │
//!  │ (severity    │       │   Scheduler   │      │  (permits for  │
//!  │  walk)       │       │ (one-shot)    │      │   submitters)  │
//!  └──────┬───────┘       └───────────────┘      └────────────────┘
//!         │
//!  ┌──────▼─────────────────────────────────────────────┐
//!  │ helix-gpu-hal ports: registers, rail, queue, ...   │
//!  └────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod config;
pub mod controller;
pub mod gate;
pub mod hardware;
pub mod poll;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod timer;

mod transition;

#[cfg(test)]
mod testing;

pub use config::PowerConfig;
pub use controller::{CoreId, LockedState, PowerController};
pub use gate::{Gate, SubmissionGate, SubmissionPermit};
pub use hardware::{CoreHardware, RailStatus};
pub use scheduler::PendingTimeout;
pub use state::{PowerRequest, PowerState, RequestClass, RequestMode, TimeoutTicket};
pub use stats::PowerStats;
pub use timer::{StateDurations, StateTimer};

pub use helix_gpu_hal::{Error, Result};

/// How blocking gate waits pass the time
#[cfg(any(feature = "std", test))]
pub(crate) type Relax = spin::relax::Yield;

/// How blocking gate waits pass the time
#[cfg(not(any(feature = "std", test)))]
pub(crate) type Relax = spin::relax::Spin;

//! # Helix GPU Hardware Abstraction Layer
//!
//! The narrow hardware and OS surface the GPU core power controller is built
//! on. Everything in this crate is a *collaborator*: the controller drives it,
//! never the other way round.
//!
//! ## Components
//!
//! - **Error**: the unified error type shared by every port
//! - **Registers**: register offsets, clock-control encoding, chip signature
//! - **Ports**: register access, power rail, command queue, bring-up,
//!   cache flush and idle query traits
//! - **OS services**: monotonic clock, delay and one-shot timer traits
//! - **Hosted services** (`std` feature): thread-backed implementations
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    helix-gpu-power                           │
//! └───────────────┬──────────────────────────────┬───────────────┘
//!                 │                              │
//!        ┌────────▼────────┐            ┌────────▼────────┐
//!        │      Ports      │            │   OS services   │
//!        │ (regs, rail,    │            │ (clock, delay,  │
//!        │  queue, init)   │            │  one-shot timer)│
//!        └─────────────────┘            └─────────────────┘
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

pub mod error;
pub mod os;
pub mod ports;
pub mod regs;

#[cfg(any(feature = "std", test))]
pub mod hosted;

// Re-exports for convenience
pub use error::{Access, Error, RegisterFault, Result};
pub use os::{OneShotTimer, Platform, TimerCallback};
pub use ports::{CacheFlush, CommandQueue, HardwareBringup, IdleQuery, PowerRail, RegisterPort};
pub use regs::{ChipSignature, ClockControl, ClockProfile};

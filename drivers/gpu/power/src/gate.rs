//! # Power Gates
//!
//! Ownerless binary semaphores used to arbitrate between the power
//! controller and everything that wants the hardware powered.
//!
//! A gate may be released by a different thread than the one that acquired
//! it: the controller takes the cross-core gate in one request and gives it
//! back in a later one.

use core::sync::atomic::{AtomicBool, Ordering};

use spin::relax::RelaxStrategy;

use crate::Relax;

// =============================================================================
// GATE
// =============================================================================

/// Binary semaphore backed by an atomic flag
#[derive(Debug, Default)]
pub struct Gate {
    held: AtomicBool,
}

impl Gate {
    /// Create a released gate
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the gate if it is free
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Take the gate, waiting for it to be released
    pub fn acquire(&self) {
        while !self.try_acquire() {
            self.wait_released();
        }
    }

    /// Give the gate back
    pub fn release(&self) {
        let was_held = self.held.swap(false, Ordering::Release);
        debug_assert!(was_held, "releasing a gate that is not held");
    }

    /// Whether someone holds the gate (non-owning check)
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Wait until the gate is observed free, without taking it
    pub fn wait_released(&self) {
        while self.is_held() {
            Relax::relax();
        }
    }
}

// =============================================================================
// SUBMISSION GATE
// =============================================================================

/// Gate between command submission and power-down
///
/// The controller holds it from the moment it starts leaving ON until the
/// core is back ON. A submitter holding a [`SubmissionPermit`] knows the
/// hardware is powered for the lifetime of the permit.
///
/// Submitters must bring the core up (an Auto request) *before* entering
/// the gate: a power request issued while holding a permit can deadlock
/// against a power-down waiting for that permit.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    gate: Gate,
}

impl SubmissionGate {
    /// Create a released gate
    pub const fn new() -> Self {
        Self { gate: Gate::new() }
    }

    /// Wait for the hardware to be powered and take a permit
    pub fn enter(&self) -> SubmissionPermit<'_> {
        self.gate.acquire();
        SubmissionPermit { gate: &self.gate }
    }

    /// Take a permit if the hardware is powered and no one else holds one
    pub fn try_enter(&self) -> Option<SubmissionPermit<'_>> {
        if self.gate.try_acquire() {
            Some(SubmissionPermit { gate: &self.gate })
        } else {
            None
        }
    }

    /// Whether a permit or the controller currently holds the gate
    pub fn is_held(&self) -> bool {
        self.gate.is_held()
    }

    pub(crate) fn raw(&self) -> &Gate {
        &self.gate
    }
}

/// Proof that command submission may touch the hardware
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct SubmissionPermit<'a> {
    gate: &'a Gate,
}

impl Drop for SubmissionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

// =============================================================================
// TESTS
// =============================================================================

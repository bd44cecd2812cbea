//! # Direction Transitions
//!
//! The bodies that physically move a core between power states. Both
//! directions walk the severity ladder one level at a time and run the
//! action belonging to each level they cross, so ON → OFF performs the IDLE
//! and SUSPEND work on its way down, and OFF → ON the SUSPEND work on its way
//! up.
//!
//! ```text
//!   power down:  ON ──drain──▶ IDLE ──stop queue──▶ SUSPEND ──flush──▶ OFF
//!   power up:    OFF ──rail on, liveness──▶ SUSPEND ──clock on, start──▶ IDLE ──▶ ON
//! ```
//!
//! A body never touches `current_state`; the controller commits the new
//! state only after the body returned `Ok`. A body that fails part way puts
//! the rails back where `from` keeps them, so the hardware never drifts from
//! the state the controller still reports.

use core::cmp::Ordering;

use helix_gpu_hal::{ChipSignature, Error, Platform, Result};

use crate::config::PowerConfig;
use crate::hardware::{CoreHardware, RailStatus};
use crate::poll::{poll_until, Backoff};
use crate::state::PowerState;

/// One transition in progress
pub(crate) struct Transition<'a> {
    pub hw: &'a CoreHardware,
    pub platform: &'a dyn Platform,
    pub config: &'a PowerConfig,
    pub signature: ChipSignature,
    pub rails: &'a mut RailStatus,
    pub broadcast: bool,
}

impl Transition<'_> {
    /// Move the hardware from `from` to `to`
    pub fn run(&mut self, from: PowerState, to: PowerState) -> Result<()> {
        let result = match to.cmp(&from) {
            Ordering::Greater => self.power_down(from, to),
            Ordering::Less => self.power_up(from, to),
            Ordering::Equal => Ok(()),
        };
        if result.is_err() {
            self.restore(from);
        }
        result
    }

    /// Return the rails to the status `state` keeps them in
    ///
    /// Best effort: the walk already failed and its error is the one the
    /// caller sees.
    fn restore(&mut self, state: PowerState) {
        let RailStatus { clock, power } = RailStatus::of(state);
        if let Err(err) = self.switch(clock, power) {
            log::error!("GPU power: cannot return rails to {}: {}", state, err);
        }
    }

    // =========================================================================
    // Off direction
    // =========================================================================

    fn power_down(&mut self, from: PowerState, to: PowerState) -> Result<()> {
        let mut level = from;
        while let Some(next) = level.deeper().filter(|next| *next <= to) {
            match next {
                PowerState::Idle => self.drain()?,
                PowerState::Suspend => self.hw.queue.stop()?,
                PowerState::Off => self.flush_caches()?,
                PowerState::On => {}
            }
            level = next;
        }

        self.program_clock(to)?;
        match to {
            PowerState::Suspend => self.switch(false, true),
            PowerState::Off => self.switch(false, false),
            PowerState::On | PowerState::Idle => Ok(()),
        }
    }

    /// Make sure nothing is executing before the queue may be stopped
    fn drain(&mut self) -> Result<()> {
        let idle = &self.hw.idle;

        if self.broadcast {
            return if idle.is_idle(false)? {
                Ok(())
            } else {
                Err(Error::NotReady)
            };
        }

        self.hw.queue.stall(true)?;
        let drained = poll_until(self.platform, self.config.idle_timeout, self.backoff(), || {
            idle.is_idle(true)
        })?;
        if !drained {
            log::error!("GPU power: pipeline still busy after {:?}", self.config.idle_timeout);
            return Err(Error::Timeout);
        }
        Ok(())
    }

    fn flush_caches(&mut self) -> Result<()> {
        // Flushing needs a running clock; SUSPEND left it off
        if !self.rails.clock {
            self.switch(true, true)?;
        }
        self.hw.caches.flush_caches()
    }

    // =========================================================================
    // On direction
    // =========================================================================

    fn power_up(&mut self, from: PowerState, to: PowerState) -> Result<()> {
        let mut level = from;
        let mut clocked = false;

        while let Some(next) = level.shallower().filter(|next| *next >= to) {
            match next {
                PowerState::Suspend => {
                    self.wake()?;
                    if to == PowerState::Suspend {
                        // Primed but clocked off: reprogram while the clock runs
                        self.program_clock(PowerState::Suspend)?;
                        self.hw.bringup.reinitialize()?;
                        self.switch(false, true)?;
                        clocked = true;
                    }
                }
                PowerState::Idle => {
                    self.switch(true, true)?;
                    self.platform.delay(self.config.settle_delay);
                    self.program_clock(to)?;
                    clocked = true;
                    if from == PowerState::Off {
                        self.hw.bringup.reinitialize()?;
                    }
                    self.hw.queue.start()?;
                }
                PowerState::On | PowerState::Off => {}
            }
            level = next;
        }

        if !clocked {
            self.program_clock(to)?;
        }
        Ok(())
    }

    /// Power the rail and wait for the core to answer with its signature
    fn wake(&mut self) -> Result<()> {
        self.switch(true, true)?;

        let registers = &*self.hw.registers;
        let expected = self.signature;
        let alive = poll_until(self.platform, self.config.liveness_timeout, self.backoff(), || {
            Ok(ChipSignature::read(registers)? == expected)
        })?;
        if !alive {
            log::error!(
                "GPU power: no valid signature {:#x}/{:#x} within {:?}",
                expected.chip_id,
                expected.revision,
                self.config.liveness_timeout
            );
            return Err(Error::DeviceNotResponding);
        }
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn switch(&mut self, clock: bool, power: bool) -> Result<()> {
        let wanted = RailStatus { clock, power };
        if *self.rails == wanted {
            return Ok(());
        }
        let result = self.hw.rail.set_power(clock, power);
        if result.is_ok() {
            *self.rails = wanted;
        }
        result
    }

    /// Program the clock profile of `state`, if the register is reachable
    /// and frequency scaling does not own it
    fn program_clock(&self, state: PowerState) -> Result<()> {
        if self.config.dynamic_frequency_scaling || !self.rails.is_live() {
            return Ok(());
        }
        state.clock_profile().program(&*self.hw.registers)
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.config.backoff_initial, self.config.backoff_max)
    }
}

// =============================================================================
// TESTS
// =============================================================================

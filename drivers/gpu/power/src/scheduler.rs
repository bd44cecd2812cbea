//! # Delayed Power-Off Scheduler
//!
//! After the core settles in IDLE or SUSPEND, a one-shot timer asks for a
//! further power-down once the grace period runs out. Cancellation does not
//! rely on stopping the timer in time: the pending ticket is cleared, and an
//! expiry whose ticket is no longer pending is ignored by the controller.
//!
//! An expiry that finds the state lock taken never waits for it. It asks the
//! scheduler to [`retry`](PowerOffScheduler::retry) a little later with the
//! same ticket, so any arming or cancellation in between still wins.

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};
use core::fmt;
use core::time::Duration;

use helix_gpu_hal::{OneShotTimer, Result};

use crate::controller::PowerController;
use crate::state::{PowerState, TimeoutTicket};

/// The arming the controller is currently waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimeout {
    /// State the expiry will request
    pub target: PowerState,
    /// Ticket carried by the expiry
    pub ticket: TimeoutTicket,
}

/// Arms and cancels the delayed power-off timer
///
/// Kept behind its own lock, which is only ever taken briefly: by request
/// processing while it holds the state lock, and by a contended expiry that
/// does not.
pub struct PowerOffScheduler {
    timer: Arc<dyn OneShotTimer>,
    owner: Weak<PowerController>,
    pending: Option<PendingTimeout>,
    next_ticket: u64,
}

impl PowerOffScheduler {
    pub(crate) fn new(timer: Arc<dyn OneShotTimer>, owner: Weak<PowerController>) -> Self {
        Self {
            timer,
            owner,
            pending: None,
            next_ticket: 1,
        }
    }

    /// (Re)start the timer; on expiry the controller is asked for `target`
    pub fn arm(&mut self, after: Duration, target: PowerState) -> Result<TimeoutTicket> {
        let ticket = TimeoutTicket(self.next_ticket);
        self.next_ticket += 1;
        self.start(after, PendingTimeout { target, ticket })?;
        Ok(ticket)
    }

    /// Fire the expiry of `target`/`ticket` again after `after`
    ///
    /// Returns `Ok(false)` without touching the timer when that arming has
    /// been superseded or cancelled in the meantime.
    pub fn retry(
        &mut self,
        after: Duration,
        target: PowerState,
        ticket: TimeoutTicket,
    ) -> Result<bool> {
        if !self.is_pending(target, ticket) {
            return Ok(false);
        }
        self.start(after, PendingTimeout { target, ticket })?;
        Ok(true)
    }

    fn start(&mut self, after: Duration, pending: PendingTimeout) -> Result<()> {
        let PendingTimeout { target, ticket } = pending;
        let owner = self.owner.clone();
        let expiry = Box::new(move || {
            if let Some(controller) = owner.upgrade() {
                controller.expire_power_off(target, ticket);
            }
        });

        self.pending = Some(pending);
        if let Err(err) = self.timer.start(after, expiry) {
            self.pending = None;
            return Err(err);
        }
        Ok(())
    }

    /// Forget the pending arming and stop the timer if it has not fired
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            self.timer.stop();
        }
    }

    /// Whether an expiry for `target` with `ticket` is still wanted
    pub fn is_pending(&self, target: PowerState, ticket: TimeoutTicket) -> bool {
        self.pending == Some(PendingTimeout { target, ticket })
    }

    /// The arming currently pending, if any
    pub fn pending(&self) -> Option<PendingTimeout> {
        self.pending
    }
}

impl fmt::Debug for PowerOffScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerOffScheduler")
            .field("pending", &self.pending)
            .field("next_ticket", &self.next_ticket)
            .finish_non_exhaustive()
    }
}

impl Drop for PowerOffScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualTimer;

    fn scheduler(timer: &Arc<ManualTimer>) -> PowerOffScheduler {
        PowerOffScheduler::new(timer.clone(), Weak::new())
    }

    #[test]
    fn test_arm_sets_pending() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let ticket = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();
        assert!(sched.is_pending(PowerState::Off, ticket));
        assert_eq!(timer.armed(), 1);
        assert_eq!(timer.last_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_rearm_supersedes_ticket() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let first = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();
        let second = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();
        assert_ne!(first, second);
        assert!(!sched.is_pending(PowerState::Off, first));
        assert!(sched.is_pending(PowerState::Off, second));
    }

    #[test]
    fn test_cancel_clears_and_stops() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let ticket = sched.arm(Duration::from_millis(5), PowerState::Off).unwrap();
        sched.cancel();
        assert!(!sched.is_pending(PowerState::Off, ticket));
        assert_eq!(sched.pending(), None);
        assert_eq!(timer.stops(), 1);

        // Nothing pending: no redundant stop
        sched.cancel();
        assert_eq!(timer.stops(), 1);
    }

    #[test]
    fn test_failed_start_leaves_nothing_pending() {
        let timer = Arc::new(ManualTimer::new());
        timer.fail_next_start();
        let mut sched = scheduler(&timer);
        assert!(sched.arm(Duration::from_millis(5), PowerState::Off).is_err());
        assert_eq!(sched.pending(), None);
    }

    #[test]
    fn test_retry_keeps_ticket() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let ticket = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();

        assert_eq!(sched.retry(Duration::from_millis(10), PowerState::Off, ticket), Ok(true));
        assert!(sched.is_pending(PowerState::Off, ticket));
        assert_eq!(timer.armed(), 2);
        assert_eq!(timer.last_delay(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_retry_of_superseded_arming_is_skipped() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let first = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();
        let second = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();

        assert_eq!(sched.retry(Duration::from_millis(10), PowerState::Off, first), Ok(false));
        assert!(sched.is_pending(PowerState::Off, second));
        assert_eq!(timer.armed(), 2);

        sched.cancel();
        assert_eq!(sched.retry(Duration::from_millis(10), PowerState::Off, second), Ok(false));
        assert_eq!(timer.armed(), 2);
    }

    #[test]
    fn test_failed_retry_drops_pending() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        let ticket = sched.arm(Duration::from_millis(100), PowerState::Off).unwrap();
        timer.fail_next_start();

        assert!(sched.retry(Duration::from_millis(10), PowerState::Off, ticket).is_err());
        assert_eq!(sched.pending(), None);
    }

    #[test]
    fn test_expiry_without_owner_is_harmless() {
        let timer = Arc::new(ManualTimer::new());
        let mut sched = scheduler(&timer);
        sched.arm(Duration::from_millis(5), PowerState::Off).unwrap();
        assert!(timer.fire());
    }
}

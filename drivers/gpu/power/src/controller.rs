//! # Power State Controller
//!
//! One controller per GPU core. It owns the authoritative power state and
//! every gate around it, and is the only code that moves the core between
//! ON, IDLE, SUSPEND and OFF.
//!
//! ## Request Protocol
//!
//! ```text
//! request ──▶ state lock ──▶ no-op checks ──▶ gate arbitration ──▶ leave ON?
//!   (broadcast: try,          same state       global: own           submission
//!    drop on contention)      policy           cross-core gate       gate + commits
//!                             stale timeout    auto: wait for        │
//!                                              global ON             ▼
//!                                                            direction body
//!                                                                    │
//!              scheduler update ◀── commit state ◀── release gates on ON
//! ```
//!
//! Any failure before the commit rolls back the gates taken by the request
//! and leaves the state untouched, so a retry starts from a known state.
//!
//! ## Gates
//!
//! - The **cross-core gate** is held while a global (explicit) non-ON state
//!   is in force. Auto requests only look at it, they never take it.
//! - The **submission gate** is held from the moment the core starts leaving
//!   ON until it is back ON. Command submission takes a permit on it.

use alloc::sync::Arc;
use core::fmt;
use core::time::Duration;

use helix_gpu_hal::{ChipSignature, Error, OneShotTimer, Platform, Result};
use spin::mutex::Mutex;

use crate::config::PowerConfig;
use crate::gate::{Gate, SubmissionGate};
use crate::hardware::{CoreHardware, RailStatus};
use crate::scheduler::{PendingTimeout, PowerOffScheduler};
use crate::state::{PowerRequest, PowerState, RequestClass, RequestMode, TimeoutTicket};
use crate::stats::{PowerCounters, PowerStats};
use crate::timer::{StateDurations, StateTimer};
use crate::transition::Transition;
use crate::Relax;

// =============================================================================
// CORE ID
// =============================================================================

/// Index of a GPU core
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoreId(pub u32);

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "core{}", self.0)
    }
}

// =============================================================================
// LOCKED STATE
// =============================================================================

struct PowerInner {
    state: PowerState,
    rails: RailStatus,
    /// A global request put the core in its current non-ON state; the
    /// cross-core gate is held exactly while this is set
    last_request_was_global: bool,
    power_off_timeout: Duration,
    power_management: bool,
    timer: StateTimer,
    hw: CoreHardware,
}

/// View of the controller for code already running under its state lock
pub struct LockedState<'a> {
    inner: &'a mut PowerInner,
    scheduler: &'a Mutex<PowerOffScheduler, Relax>,
    platform: &'a dyn Platform,
}

impl LockedState<'_> {
    /// Current power state
    pub fn query_state_unlocked(&self) -> PowerState {
        self.inner.state
    }

    /// Per-state durations, charging outstanding time to the current state
    pub fn query_state_timer_unlocked(&mut self) -> StateDurations {
        let now = self.platform.now();
        self.inner.timer.query(self.inner.state, now)
    }

    /// The raw accumulator
    pub fn state_timer(&self) -> &StateTimer {
        &self.inner.timer
    }

    /// Last known clock and rail status
    pub fn rails(&self) -> RailStatus {
        self.inner.rails
    }

    /// Delayed power-off the controller is waiting on
    pub fn pending_timeout(&self) -> Option<PendingTimeout> {
        self.scheduler.lock().pending()
    }

    /// Administrative power-management switch
    pub fn is_power_management_enabled(&self) -> bool {
        self.inner.power_management
    }
}

impl fmt::Debug for LockedState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedState")
            .field("state", &self.inner.state)
            .field("rails", &self.inner.rails)
            .field("pending", &self.scheduler.lock().pending())
            .finish_non_exhaustive()
    }
}

/// Result of one pass through the request protocol
enum Attempt {
    /// The request ran to completion (or was a no-op)
    Finished(Result<()>),
    /// Broadcast could not take the state lock
    Contended,
    /// Auto request met a global non-ON state; retry once it is lifted
    WaitForGlobalOn,
}

// =============================================================================
// POWER CONTROLLER
// =============================================================================

/// Power state controller of one GPU core
pub struct PowerController {
    core: CoreId,
    inner: Mutex<PowerInner, Relax>,
    /// Taken after the state lock, never before it
    scheduler: Mutex<PowerOffScheduler, Relax>,
    cross_core: Gate,
    submission: SubmissionGate,
    platform: Arc<dyn Platform>,
    config: PowerConfig,
    signature: ChipSignature,
    counters: PowerCounters,
}

impl PowerController {
    /// Create the controller of a core that is powered and running
    ///
    /// `signature` is what the core reports while alive; it is compared
    /// against the hardware after every power-up from OFF.
    pub fn new(
        core: CoreId,
        signature: ChipSignature,
        hardware: CoreHardware,
        platform: Arc<dyn Platform>,
        timer: Arc<dyn OneShotTimer>,
        config: PowerConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let origin = platform.now();

        log::debug!(
            "GPU {}: power controller up, power-off timeout {:?}, management {}",
            core,
            config.power_off_timeout,
            if config.power_management { "on" } else { "off" }
        );

        Ok(Arc::new_cyclic(|owner| Self {
            core,
            inner: Mutex::new(PowerInner {
                state: PowerState::On,
                rails: RailStatus::ON,
                last_request_was_global: false,
                power_off_timeout: config.power_off_timeout,
                power_management: config.power_management,
                timer: StateTimer::new(origin),
                hw: hardware,
            }),
            scheduler: Mutex::new(PowerOffScheduler::new(timer, owner.clone())),
            cross_core: Gate::new(),
            submission: SubmissionGate::new(),
            platform,
            config,
            signature,
            counters: PowerCounters::default(),
        }))
    }

    /// Core this controller drives
    pub fn core(&self) -> CoreId {
        self.core
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Move the core to the requested power state
    ///
    /// Explicit and auto requests block until they can run. Broadcast
    /// requests never block: they succeed without effect when another
    /// transition is in flight, and fail with [`Error::NotReady`] when the
    /// hardware or the submission path is busy.
    pub fn request_state(&self, request: PowerRequest) -> Result<()> {
        loop {
            match self.attempt(request) {
                Attempt::Finished(result) => return self.settle(request, result),
                Attempt::Contended => {
                    self.counters.dropped_broadcast();
                    log::trace!("GPU {}: {} dropped, transition in flight", self.core, request);
                    return Ok(());
                }
                Attempt::WaitForGlobalOn => {
                    log::debug!("GPU {}: {} waiting for global ON", self.core, request);
                    self.cross_core.wait_released();
                }
            }
        }
    }

    /// Timer expiry of the delayed power-off
    ///
    /// A broadcast like any other, so it never waits for the state lock.
    /// It is also the only thing that will ever power the core off, so a
    /// contended expiry is not dropped: the same arming fires again after
    /// `expiry_retry_delay`, unless a request supersedes it first.
    pub(crate) fn expire_power_off(&self, target: PowerState, ticket: TimeoutTicket) {
        let request = PowerRequest::timeout(target, ticket);
        match self.attempt(request) {
            Attempt::Finished(result) => {
                // Nobody to hand the error to; settle logs it
                let _ = self.settle(request, result);
            }
            Attempt::Contended | Attempt::WaitForGlobalOn => self.defer_expiry(request, ticket),
        }
    }

    fn defer_expiry(&self, request: PowerRequest, ticket: TimeoutTicket) {
        let delay = self.config.expiry_retry_delay;
        let retried = self.scheduler.lock().retry(delay, request.target(), ticket);

        match retried {
            Ok(true) => {
                log::trace!("GPU {}: {} deferred by {:?}, state lock busy", self.core, request, delay);
            }
            Ok(false) => {
                self.counters.stale_timeout();
                log::trace!("GPU {}: {} superseded", self.core, request);
            }
            Err(err) => {
                self.counters.failure();
                log::error!("GPU {}: {} lost, cannot re-arm: {}", self.core, request, err);
            }
        }
    }

    fn attempt(&self, request: PowerRequest) -> Attempt {
        if request.is_broadcast() {
            match self.inner.try_lock() {
                Some(mut inner) => self.arbitrate(&mut inner, request),
                None => Attempt::Contended,
            }
        } else {
            self.arbitrate(&mut self.inner.lock(), request)
        }
    }

    fn settle(&self, request: PowerRequest, result: Result<()>) -> Result<()> {
        match result {
            Err(Error::NotReady) => {
                self.counters.not_ready();
                log::debug!("GPU {}: {} not ready", self.core, request);
            }
            Err(err) => {
                self.counters.failure();
                log::error!("GPU {}: {} failed: {}", self.core, request, err);
            }
            Ok(()) => {}
        }
        result
    }

    /// Everything after the state lock, up to and including the commit
    fn arbitrate(&self, inner: &mut PowerInner, request: PowerRequest) -> Attempt {
        let from = inner.state;
        let target = request.target();

        if from == target {
            return Attempt::Finished(Ok(()));
        }

        if !request.is_global()
            && !inner.power_management
            && (from == PowerState::On || target != PowerState::On)
        {
            log::trace!("GPU {}: {} dropped, power management disabled", self.core, request);
            return Attempt::Finished(Ok(()));
        }

        // Never wake the core just to suspend it
        if request.is_broadcast() && target == PowerState::Suspend && from == PowerState::Off {
            return Attempt::Finished(Ok(()));
        }

        if let RequestMode::Timeout(ticket) = request.mode() {
            if !self.scheduler.lock().is_pending(target, ticket) {
                self.counters.stale_timeout();
                log::trace!("GPU {}: {} superseded", self.core, request);
                return Attempt::Finished(Ok(()));
            }
        }

        // Gate arbitration
        let mut took_cross_core = false;
        match request.class() {
            RequestClass::Global if target != PowerState::On && !inner.last_request_was_global => {
                if !self.cross_core.try_acquire() {
                    log::warn!(
                        "GPU {}: cross-core gate held while no global state is in force",
                        self.core
                    );
                    return Attempt::Finished(Err(Error::InvalidState));
                }
                took_cross_core = true;
            }
            RequestClass::Auto if self.cross_core.is_held() => {
                return Attempt::WaitForGlobalOn;
            }
            _ => {}
        }

        // Leaving ON: fence off command submission
        let mut took_submission = false;
        if from == PowerState::On {
            let gate = self.submission.raw();
            if request.is_broadcast() {
                if !gate.try_acquire() {
                    self.rollback(false, took_cross_core);
                    return Attempt::Finished(Err(Error::NotReady));
                }
            } else {
                gate.acquire();
            }
            took_submission = true;

            let commits = inner.hw.queue.in_flight_commits();
            if commits != 0 {
                if request.is_broadcast() {
                    self.rollback(took_submission, took_cross_core);
                    return Attempt::Finished(Err(Error::NotReady));
                }
                log::warn!(
                    "GPU {}: {} leaving ON with {} commit(s) in flight",
                    self.core,
                    request,
                    commits
                );
            }
        }

        log::debug!("GPU {}: {} -> {} ({})", self.core, from, target, request);
        let moved = Transition {
            hw: &inner.hw,
            platform: &*self.platform,
            config: &self.config,
            signature: self.signature,
            rails: &mut inner.rails,
            broadcast: request.is_broadcast(),
        }
        .run(from, target);

        if let Err(err) = moved {
            self.rollback(took_submission, took_cross_core);
            return Attempt::Finished(Err(err));
        }

        if target == PowerState::On {
            self.submission.raw().release();
            if inner.last_request_was_global {
                self.cross_core.release();
            }
            inner.last_request_was_global = false;
        } else if took_cross_core {
            inner.last_request_was_global = true;
        }

        inner.timer.accumulate(from, self.platform.now());
        inner.state = target;
        self.counters.transition();
        log::info!("GPU {}: power state {} -> {}", self.core, from, target);

        Attempt::Finished(self.reschedule(inner.power_off_timeout, target))
    }

    /// Arm the delayed power-off after settling in IDLE or SUSPEND
    fn reschedule(&self, timeout: Duration, target: PowerState) -> Result<()> {
        let mut scheduler = self.scheduler.lock();
        match target {
            PowerState::Idle | PowerState::Suspend if !timeout.is_zero() => {
                let ticket = scheduler.arm(timeout, PowerState::Off)?;
                log::trace!("GPU {}: power-off armed in {:?} ({:?})", self.core, timeout, ticket);
                Ok(())
            }
            _ => {
                scheduler.cancel();
                Ok(())
            }
        }
    }

    fn rollback(&self, submission: bool, cross_core: bool) {
        if submission {
            self.submission.raw().release();
        }
        if cross_core {
            self.cross_core.release();
        }
    }

    // =========================================================================
    // Queries and settings
    // =========================================================================

    /// Current power state
    pub fn query_state(&self) -> PowerState {
        self.inner.lock().state
    }

    /// Run `f` under the state lock
    ///
    /// `f` must not issue power requests on this controller.
    pub fn with_state_lock<R>(&self, f: impl FnOnce(&mut LockedState<'_>) -> R) -> R {
        let mut inner = self.inner.lock();
        let mut locked = LockedState {
            inner: &mut *inner,
            scheduler: &self.scheduler,
            platform: &*self.platform,
        };
        f(&mut locked)
    }

    /// Enable or disable opportunistic power management
    pub fn set_power_management_enabled(&self, enabled: bool) {
        self.inner.lock().power_management = enabled;
        log::info!(
            "GPU {}: power management {}",
            self.core,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Administrative power-management switch
    pub fn is_power_management_enabled(&self) -> bool {
        self.inner.lock().power_management
    }

    /// Per-state durations since the last reset
    pub fn query_state_timer(&self) -> StateDurations {
        let mut inner = self.inner.lock();
        let state = inner.state;
        inner.timer.query(state, self.platform.now())
    }

    /// Restart per-state accounting now
    pub fn reset_state_timer(&self) {
        self.inner.lock().timer.reset(self.platform.now());
    }

    /// Set the delayed power-off grace period; zero disables it and cancels
    /// a pending power-off
    pub fn set_power_off_timeout(&self, timeout: Duration) {
        let mut inner = self.inner.lock();
        inner.power_off_timeout = timeout;
        if timeout.is_zero() {
            self.scheduler.lock().cancel();
        }
    }

    /// Delayed power-off grace period
    pub fn power_off_timeout(&self) -> Duration {
        self.inner.lock().power_off_timeout
    }

    /// Whether a global non-ON state is in force (lock-free)
    pub fn is_global_non_on_active(&self) -> bool {
        self.cross_core.is_held()
    }

    /// Gate command submission must pass before touching the hardware
    pub fn submission_gate(&self) -> &SubmissionGate {
        &self.submission
    }

    /// Last known clock and rail status
    pub fn rail_status(&self) -> RailStatus {
        self.inner.lock().rails
    }

    /// Counter snapshot (lock-free)
    pub fn stats(&self) -> PowerStats {
        self.counters.snapshot()
    }
}

static_assertions::assert_impl_all!(PowerController: Send, Sync);
static_assertions::assert_impl_all!(PowerRequest: Send, Sync, Copy);

impl fmt::Debug for PowerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerController")
            .field("core", &self.core)
            .field("global_non_on", &self.cross_core.is_held())
            .field("submission_held", &self.submission.is_held())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

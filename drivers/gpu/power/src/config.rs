//! # Power Controller Configuration

use core::time::Duration;

use helix_gpu_hal::{Error, Result};

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default grace period before an IDLE/SUSPEND core is powered off
pub const DEFAULT_POWER_OFF_TIMEOUT: Duration = Duration::from_millis(300);
/// Default bound on the post-power-up liveness poll
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_millis(100);
/// Default bound on the idle wait of an explicit power-down
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default re-arm delay of a power-off expiry that met a busy state lock
pub const DEFAULT_EXPIRY_RETRY_DELAY: Duration = Duration::from_millis(10);

// =============================================================================
// POWER CONFIG
// =============================================================================

/// Power controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    /// Delay before IDLE/SUSPEND is followed by an automatic OFF (zero disables)
    pub power_off_timeout: Duration,
    /// Initial state of the administrative power-management switch
    pub power_management: bool,
    /// Bound on the liveness poll after the rail comes back
    pub liveness_timeout: Duration,
    /// Bound on the idle wait after stalling the queue
    pub idle_timeout: Duration,
    /// First retry delay of the exponential backoff
    pub backoff_initial: Duration,
    /// Cap on the exponential backoff
    pub backoff_max: Duration,
    /// Delay after re-enabling the clock before touching the core
    pub settle_delay: Duration,
    /// Re-arm delay of a power-off expiry that found the state lock taken
    pub expiry_retry_delay: Duration,
    /// Frequency scaling owns the clock-control register; do not program it
    pub dynamic_frequency_scaling: bool,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            power_off_timeout: DEFAULT_POWER_OFF_TIMEOUT,
            power_management: true,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            backoff_initial: Duration::from_millis(1),
            backoff_max: Duration::from_millis(32),
            settle_delay: Duration::from_millis(1),
            expiry_retry_delay: DEFAULT_EXPIRY_RETRY_DELAY,
            dynamic_frequency_scaling: false,
        }
    }
}

impl PowerConfig {
    /// Set the delayed power-off grace period
    pub fn with_power_off_timeout(mut self, timeout: Duration) -> Self {
        self.power_off_timeout = timeout;
        self
    }

    /// Set the initial power-management switch
    pub fn with_power_management(mut self, enabled: bool) -> Self {
        self.power_management = enabled;
        self
    }

    /// Set the liveness poll bound
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the idle wait bound
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the backoff range
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff_initial = initial;
        self.backoff_max = max;
        self
    }

    /// Set the clock settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the re-arm delay of a contended power-off expiry
    pub fn with_expiry_retry_delay(mut self, delay: Duration) -> Self {
        self.expiry_retry_delay = delay;
        self
    }

    /// Leave the clock-control register to frequency scaling
    pub fn with_dynamic_frequency_scaling(mut self, enabled: bool) -> Self {
        self.dynamic_frequency_scaling = enabled;
        self
    }

    /// Check the configuration for values the poll loops cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.backoff_initial.is_zero() || self.backoff_max < self.backoff_initial {
            return Err(Error::InvalidArgument);
        }
        // A zero re-arm would spin the timer against the lock holder
        if self.expiry_retry_delay.is_zero() {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

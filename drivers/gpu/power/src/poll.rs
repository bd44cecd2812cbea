//! # Bounded Polling
//!
//! Exponential-backoff polling used by the liveness check and the idle wait.

use core::time::Duration;

use helix_gpu_hal::{Platform, Result};

/// Doubling delay sequence with a cap
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// Start at `initial`, never exceed `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial.min(max),
            max,
        }
    }

    /// The delay to use now; advances the sequence
    pub fn step(&mut self) -> Duration {
        let current = self.next;
        self.next = current.checked_mul(2).unwrap_or(self.max).min(self.max);
        current
    }
}

/// Poll `check` until it reports success or `limit` elapses
///
/// The check runs at least once. Between attempts the caller is delayed by
/// the backoff, clipped to the time remaining. Returns whether the
/// condition was met; check errors propagate immediately.
pub fn poll_until<F>(
    platform: &dyn Platform,
    limit: Duration,
    mut backoff: Backoff,
    mut check: F,
) -> Result<bool>
where
    F: FnMut() -> Result<bool>,
{
    let started = platform.now();
    loop {
        if check()? {
            return Ok(true);
        }

        let spent = platform.now().saturating_sub(started);
        if spent >= limit {
            return Ok(false);
        }
        platform.delay(backoff.step().min(limit - spent));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualPlatform;
    use helix_gpu_hal::Error;

    const fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(ms(1), ms(5));
        let steps: [Duration; 5] = core::array::from_fn(|_| backoff.step());
        assert_eq!(steps, [ms(1), ms(2), ms(4), ms(5), ms(5)]);
    }

    #[test]
    fn test_backoff_saturates_near_duration_max() {
        let mut backoff = Backoff::new(Duration::MAX / 2 + ms(1), Duration::MAX);
        assert_eq!(backoff.step(), Duration::MAX / 2 + ms(1));
        assert_eq!(backoff.step(), Duration::MAX);
        assert_eq!(backoff.step(), Duration::MAX);
    }

    #[test]
    fn test_succeeds_after_retries() {
        let platform = ManualPlatform::new();
        let mut attempts = 0;
        let met = poll_until(&platform, ms(100), Backoff::new(ms(1), ms(8)), || {
            attempts += 1;
            Ok(attempts == 4)
        })
        .unwrap();
        assert!(met);
        assert_eq!(platform.delays(), [ms(1), ms(2), ms(4)]);
    }

    #[test]
    fn test_gives_up_at_limit() {
        let platform = ManualPlatform::new();
        let met = poll_until(&platform, ms(10), Backoff::new(ms(4), ms(4)), || Ok(false)).unwrap();
        assert!(!met);
        // 4 + 4 + 2 (clipped) = 10
        assert_eq!(platform.now(), ms(10));
    }

    #[test]
    fn test_check_error_propagates() {
        let platform = ManualPlatform::new();
        let result = poll_until(&platform, ms(10), Backoff::new(ms(1), ms(1)), || {
            Err(Error::InvalidState)
        });
        assert_eq!(result, Err(Error::InvalidState));
        assert!(platform.delays().is_empty());
    }
}

//! # Power State Timer
//!
//! Accumulates how long the core spent in each power state. All methods are
//! called with the state lock held; the timer itself is not synchronized.

use core::time::Duration;

use crate::state::PowerState;

/// Time spent in each power state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateDurations {
    /// Time spent ON
    pub on: Duration,
    /// Time spent OFF
    pub off: Duration,
    /// Time spent IDLE
    pub idle: Duration,
    /// Time spent SUSPEND
    pub suspend: Duration,
}

impl StateDurations {
    /// Sum over all states
    pub fn total(&self) -> Duration {
        self.on + self.off + self.idle + self.suspend
    }
}

/// Per-state wall-clock accumulator
///
/// Invariant: `sum(elapsed) + (now - recent) == now - start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTimer {
    start: Duration,
    recent: Duration,
    elapsed: [Duration; 4],
}

impl StateTimer {
    /// Create a timer whose accounting starts at `origin`
    pub fn new(origin: Duration) -> Self {
        Self {
            start: origin,
            recent: origin,
            elapsed: [Duration::ZERO; 4],
        }
    }

    /// Restart accounting at `origin`
    pub fn reset(&mut self, origin: Duration) {
        *self = Self::new(origin);
    }

    /// Charge the time since the last accumulation to `old`
    pub fn accumulate(&mut self, old: PowerState, now: Duration) {
        // A clock that steps backwards charges nothing rather than underflowing
        let delta = now.saturating_sub(self.recent);
        self.elapsed[old.index()] += delta;
        self.recent = self.recent.max(now);
    }

    /// Charge outstanding time to `current` and report every state
    pub fn query(&mut self, current: PowerState, now: Duration) -> StateDurations {
        self.accumulate(current, now);
        StateDurations {
            on: self.elapsed[PowerState::On.index()],
            off: self.elapsed[PowerState::Off.index()],
            idle: self.elapsed[PowerState::Idle.index()],
            suspend: self.elapsed[PowerState::Suspend.index()],
        }
    }

    /// Time accumulated for one state, without charging outstanding time
    pub fn elapsed(&self, state: PowerState) -> Duration {
        self.elapsed[state.index()]
    }

    /// Start of accounting
    pub fn start(&self) -> Duration {
        self.start
    }

    /// Time of the last accumulation
    pub fn recent(&self) -> Duration {
        self.recent
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! Test doubles: a recording GPU, a manual clock and a manual timer.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use core::time::Duration;

use helix_gpu_hal::regs::offsets;
use helix_gpu_hal::{
    CacheFlush, ChipSignature, ClockControl, ClockProfile, CommandQueue, Error, HardwareBringup,
    IdleQuery, OneShotTimer, Platform, PowerRail, RegisterFault, RegisterPort, Result,
    TimerCallback,
};
use spin::Mutex;

use crate::hardware::CoreHardware;

/// Signature reported by a live [`MockGpu`]
pub const SIGNATURE: ChipSignature = ChipSignature::new(0x7000, 0x5_2000);

// =============================================================================
// MOCK GPU
// =============================================================================

/// Observable side effect on the mock hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwEvent {
    Rail { clock: bool, power: bool },
    Clock(ClockProfile),
    Start,
    Stop,
    Stall { blocking: bool },
    Reinit,
    Flush,
    IdlePoll { blocking: bool },
}

/// Records every call and lets tests inject busy or dead hardware
#[derive(Default)]
pub struct MockGpu {
    events: Mutex<Vec<HwEvent>>,
    in_flight: AtomicI32,
    busy_polls: AtomicU32,
    dead_reads: AtomicU32,
    fail_writes: AtomicBool,
    fail_flush: AtomicBool,
    call_delay_us: AtomicU64,
    active: AtomicUsize,
    overlaps: AtomicUsize,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle `self` as the ports of one core
    pub fn hardware(self: &Arc<Self>) -> CoreHardware {
        CoreHardware {
            registers: self.clone(),
            rail: self.clone(),
            queue: self.clone(),
            bringup: self.clone(),
            caches: self.clone(),
            idle: self.clone(),
        }
    }

    pub fn events(&self) -> Vec<HwEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn count(&self, event: HwEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }

    pub fn last_profile(&self) -> Option<ClockProfile> {
        self.events.lock().iter().rev().find_map(|e| match e {
            HwEvent::Clock(profile) => Some(*profile),
            _ => None,
        })
    }

    pub fn set_in_flight(&self, commits: i32) {
        self.in_flight.store(commits, Ordering::SeqCst);
    }

    /// The next `n` idle polls report busy
    pub fn set_busy_polls(&self, n: u32) {
        self.busy_polls.store(n, Ordering::SeqCst);
    }

    /// The next `n` signature reads return garbage
    pub fn set_dead_reads(&self, n: u32) {
        self.dead_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_register_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Cache flushes are recorded but report a timeout
    pub fn fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Make every recorded call sleep, widening race windows
    pub fn set_call_delay(&self, delay: Duration) {
        self.call_delay_us.store(delay.as_micros() as u64, Ordering::SeqCst);
    }

    /// Number of times two calls were observed inside the hardware at once
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn record(&self, event: HwEvent) {
        if self.active.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let delay = self.call_delay_us.load(Ordering::SeqCst);
        if delay != 0 {
            std::thread::sleep(Duration::from_micros(delay));
        }
        self.events.lock().push(event);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RegisterPort for MockGpu {
    fn read(&self, offset: u32) -> Result<u32> {
        match offset {
            offsets::CHIP_ID if Self::take(&self.dead_reads) => Ok(0xdead_beef),
            offsets::CHIP_ID => Ok(SIGNATURE.chip_id),
            offsets::CHIP_REV => Ok(SIGNATURE.revision),
            _ => Ok(0),
        }
    }

    fn write(&self, offset: u32, value: u32) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Io(RegisterFault::write(offset)));
        }
        // The load pulse is the first half of a profile write
        let pulse = ClockControl::from_bits_truncate(value).contains(ClockControl::FSCALE_LOAD);
        if offset == offsets::CLOCK_CONTROL && !pulse {
            self.record(HwEvent::Clock(ClockProfile::decode(value)));
        }
        Ok(())
    }
}

impl PowerRail for MockGpu {
    fn set_power(&self, clock_on: bool, rail_on: bool) -> Result<()> {
        self.record(HwEvent::Rail {
            clock: clock_on,
            power: rail_on,
        });
        Ok(())
    }
}

impl CommandQueue for MockGpu {
    fn start(&self) -> Result<()> {
        self.record(HwEvent::Start);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.record(HwEvent::Stop);
        Ok(())
    }

    fn stall(&self, blocking: bool) -> Result<()> {
        self.record(HwEvent::Stall { blocking });
        Ok(())
    }

    fn in_flight_commits(&self) -> i32 {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl HardwareBringup for MockGpu {
    fn reinitialize(&self) -> Result<()> {
        self.record(HwEvent::Reinit);
        Ok(())
    }
}

impl CacheFlush for MockGpu {
    fn flush_caches(&self) -> Result<()> {
        self.record(HwEvent::Flush);
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(Error::Timeout);
        }
        Ok(())
    }
}

impl IdleQuery for MockGpu {
    fn is_idle(&self, blocking: bool) -> Result<bool> {
        self.record(HwEvent::IdlePoll { blocking });
        Ok(!Self::take(&self.busy_polls))
    }
}

// =============================================================================
// MANUAL PLATFORM
// =============================================================================

/// Clock that only moves when someone delays or advances it
#[derive(Default)]
pub struct ManualPlatform {
    now_ns: AtomicU64,
    delays: Mutex<Vec<Duration>>,
}

impl ManualPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_ns.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl Platform for ManualPlatform {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }

    fn delay(&self, duration: Duration) {
        self.delays.lock().push(duration);
        self.advance(duration);
    }
}

// =============================================================================
// MANUAL TIMER
// =============================================================================

#[derive(Default)]
struct TimerSlots {
    current: Option<TimerCallback>,
    /// Expiries that were superseded or stopped but may still be running
    stale: VecDeque<TimerCallback>,
    armed: usize,
    stops: usize,
    last_delay: Option<Duration>,
    fail_next: bool,
}

/// Timer fired by hand; keeps superseded callbacks to replay stop/fire races
#[derive(Default)]
pub struct ManualTimer {
    slots: Mutex<TimerSlots>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> usize {
        self.slots.lock().armed
    }

    pub fn stops(&self) -> usize {
        self.slots.lock().stops
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.slots.lock().last_delay
    }

    pub fn is_armed(&self) -> bool {
        self.slots.lock().current.is_some()
    }

    pub fn fail_next_start(&self) {
        self.slots.lock().fail_next = true;
    }

    /// Run the current expiry. Returns whether one was armed.
    pub fn fire(&self) -> bool {
        let callback = self.slots.lock().current.take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Run the oldest superseded expiry, as if it raced its cancellation
    pub fn fire_stale(&self) -> bool {
        let callback = self.slots.lock().stale.pop_front();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl OneShotTimer for ManualTimer {
    fn start(&self, after: Duration, on_expiry: TimerCallback) -> Result<()> {
        let mut slots = self.slots.lock();
        if core::mem::take(&mut slots.fail_next) {
            return Err(Error::TimerFailed);
        }
        if let Some(previous) = slots.current.replace(on_expiry) {
            slots.stale.push_back(previous);
        }
        slots.armed += 1;
        slots.last_delay = Some(after);
        Ok(())
    }

    fn stop(&self) {
        let mut slots = self.slots.lock();
        slots.stops += 1;
        if let Some(previous) = slots.current.take() {
            slots.stale.push_back(previous);
        }
    }
}

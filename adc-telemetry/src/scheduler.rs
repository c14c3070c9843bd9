//! Cycle gating on a monotonic millisecond clock

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Milliseconds on a monotonic clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MonotonicTime(pub u64);

impl MonotonicTime {
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds since `earlier`, wrapping if the clock went backwards
    #[inline]
    pub const fn wrapping_since(&self, earlier: MonotonicTime) -> u64 {
        self.0.wrapping_sub(earlier.0)
    }
}

/// Source of monotonic time
pub trait Clock {
    fn now(&self) -> MonotonicTime;
}

/// Milliseconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> MonotonicTime {
        MonotonicTime(self.origin.elapsed().as_millis() as u64)
    }
}

/// Clock whose time is set by the caller
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MonotonicTime {
        MonotonicTime(self.now.get())
    }
}

/// Admits at most one cycle per interval
///
/// The first evaluation always runs. After that a cycle is due once
/// `interval` has passed since the previous admitted cycle; the baseline
/// moves to the time of each admitted call, so late cycles are not caught up.
#[derive(Debug, Clone)]
pub struct CycleScheduler {
    interval_ms: u64,
    last_run: Option<MonotonicTime>,
}

impl CycleScheduler {
    pub fn new(interval: Duration) -> Self {
        Self::from_millis(interval.as_millis() as u64)
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_run: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_run(&self) -> Option<MonotonicTime> {
        self.last_run
    }

    /// Decide whether a cycle may start at `now`, recording it if so
    pub fn should_run(&mut self, now: MonotonicTime) -> bool {
        let due = match self.last_run {
            None => true,
            Some(last) => now.wrapping_since(last) >= self.interval_ms,
        };
        if due {
            self.last_run = Some(now);
        }
        due
    }

    /// Milliseconds until the next cycle is due, zero if it already is
    pub fn remaining(&self, now: MonotonicTime) -> u64 {
        match self.last_run {
            None => 0,
            Some(last) => self.interval_ms.saturating_sub(now.wrapping_since(last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_gating() {
        let mut scheduler = CycleScheduler::from_millis(60_000);
        let results: Vec<bool> = [0, 30_000, 60_000, 61_000]
            .into_iter()
            .map(|t| scheduler.should_run(MonotonicTime::from_millis(t)))
            .collect();
        assert_eq!(results, vec![true, false, true, false]);
        assert_eq!(scheduler.last_run(), Some(MonotonicTime(60_000)));
    }

    #[test]
    fn test_late_call_rebaselines() {
        let mut scheduler = CycleScheduler::new(Duration::from_secs(60));
        assert!(scheduler.should_run(MonotonicTime(0)));
        assert!(scheduler.should_run(MonotonicTime(150_000)));
        assert!(!scheduler.should_run(MonotonicTime(200_000)));
        assert!(scheduler.should_run(MonotonicTime(210_000)));
    }

    #[test]
    fn test_remaining() {
        let mut scheduler = CycleScheduler::from_millis(1_000);
        assert_eq!(scheduler.remaining(MonotonicTime(0)), 0);
        scheduler.should_run(MonotonicTime(500));
        assert_eq!(scheduler.remaining(MonotonicTime(800)), 700);
        assert_eq!(scheduler.remaining(MonotonicTime(2_000)), 0);
    }

    #[test]
    fn test_clock_reset_runs_and_rebaselines() {
        let mut scheduler = CycleScheduler::from_millis(1_000);
        assert!(scheduler.should_run(MonotonicTime(5_000)));
        // Clock restarted below the baseline: the wrapped difference is huge
        assert!(scheduler.should_run(MonotonicTime(10)));
        assert_eq!(scheduler.last_run(), Some(MonotonicTime(10)));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100);
        clock.advance(50);
        assert_eq!(clock.now(), MonotonicTime(150));
        clock.set(7);
        assert_eq!(clock.now().as_millis(), 7);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}

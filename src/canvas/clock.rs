//! Time sources for the frame loop

use std::time::{Duration, Instant};

/// Monotonic time since the clock was created, plus the loop's only
/// suspension point.
pub trait Clock {
    fn now(&self) -> Duration;

    /// Block until `deadline`; returns immediately if it already passed.
    fn sleep_until(&mut self, deadline: Duration);
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        if let Some(wait) = deadline.checked_sub(self.now()) {
            std::thread::sleep(wait);
        }
    }
}

/// Simulated clock: sleeping jumps straight to the deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_never_goes_back() {
        let mut clock = ManualClock::new();
        clock.sleep_until(Duration::from_millis(20));
        assert_eq!(clock.now(), Duration::from_millis(20));
        clock.sleep_until(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(20));
        clock.advance(Duration::from_millis(1));
        assert_eq!(clock.now(), Duration::from_millis(21));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let a = clock.now();
        clock.sleep_until(a + Duration::from_millis(2));
        assert!(clock.now() >= a + Duration::from_millis(2));
    }
}

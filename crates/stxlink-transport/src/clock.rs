//! Timer implementations.
//!
//! [`DeadlineTimer`] reads a [`LogicalClock`] that only moves when someone
//! calls [`LogicalClock::advance`], so retry schedules are reproducible in
//! tests and simulations. [`MonotonicTimer`] uses the wall clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::traits::Timer;

/// Externally advanced millisecond clock.
///
/// Clones share the same counter, so one handle can be given to every timer
/// while the driving loop keeps another to advance time.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    now_ms: Arc<AtomicU64>,
}

impl LogicalClock {
    /// Create a clock at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time since creation.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    /// Move the clock forward, saturating at `u64::MAX` milliseconds.
    pub fn advance(&self, by: Duration) {
        let ms = duration_to_ms(by);
        let prev = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(ms))
            })
            .unwrap_or_else(|now| now);
        trace!(from_ms = prev, by_ms = ms, "logical clock advanced");
    }

    /// Create a stopped timer bound to this clock.
    pub fn timer(&self) -> DeadlineTimer {
        DeadlineTimer::new(self.clone())
    }

    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A deadline measured on a [`LogicalClock`].
///
/// Expires once `now - armed_at >= timeout`; a stopped timer never expires.
#[derive(Debug, Clone)]
pub struct DeadlineTimer {
    clock: LogicalClock,
    armed_at_ms: u64,
    timeout_ms: u64,
    active: bool,
}

impl DeadlineTimer {
    /// Create a stopped timer reading `clock`.
    pub fn new(clock: LogicalClock) -> Self {
        Self {
            clock,
            armed_at_ms: 0,
            timeout_ms: 0,
            active: false,
        }
    }

    /// Time left before expiry, `None` when stopped.
    pub fn remaining(&self) -> Option<Duration> {
        if !self.active {
            return None;
        }
        let elapsed = self.clock.now_ms().saturating_sub(self.armed_at_ms);
        Some(Duration::from_millis(
            self.timeout_ms.saturating_sub(elapsed),
        ))
    }
}

impl Timer for DeadlineTimer {
    fn arm(&mut self, duration: Duration) {
        self.armed_at_ms = self.clock.now_ms();
        self.timeout_ms = duration_to_ms(duration);
        self.active = true;
    }

    fn expired(&self) -> bool {
        if !self.active {
            return false;
        }
        self.clock.now_ms().saturating_sub(self.armed_at_ms) >= self.timeout_ms
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_armed(&self) -> bool {
        self.active
    }
}

/// Wall-clock deadline for coordinators running on real threads.
///
/// A duration too large to add to `Instant::now()` arms a timer that never
/// expires.
#[derive(Debug, Clone, Default)]
pub struct MonotonicTimer {
    deadline: Option<Instant>,
    armed: bool,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for MonotonicTimer {
    fn arm(&mut self, duration: Duration) {
        self.deadline = Instant::now().checked_add(duration);
        if self.deadline.is_none() {
            trace!(?duration, "timeout beyond clock range, timer will not expire");
        }
        self.armed = true;
    }

    fn expired(&self) -> bool {
        self.armed
            && self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn stop(&mut self) {
        self.deadline = None;
        self.armed = false;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_expires_after_timeout() {
        let clock = LogicalClock::new();
        let mut timer = clock.timer();

        timer.arm(Duration::from_millis(100));
        assert!(!timer.expired());

        clock.advance(Duration::from_millis(50));
        assert!(!timer.expired());

        clock.advance(Duration::from_millis(60));
        assert!(timer.expired());
    }

    #[test]
    fn timer_expires_exactly_at_deadline() {
        let clock = LogicalClock::new();
        let mut timer = clock.timer();
        timer.arm(Duration::from_millis(1000));

        clock.advance(Duration::from_millis(999));
        assert!(!timer.expired());
        clock.advance(Duration::from_millis(1));
        assert!(timer.expired());
    }

    #[test]
    fn stopped_timer_never_expires() {
        let clock = LogicalClock::new();
        let mut timer = clock.timer();
        assert!(!timer.is_armed());
        assert!(!timer.expired());

        timer.arm(Duration::from_millis(10));
        timer.stop();
        clock.advance(Duration::from_secs(5));
        assert!(!timer.expired());
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn rearm_restarts_from_current_time() {
        let clock = LogicalClock::new();
        let mut timer = clock.timer();
        timer.arm(Duration::from_millis(100));
        clock.advance(Duration::from_millis(150));
        assert!(timer.expired());

        timer.arm(Duration::from_millis(100));
        assert!(!timer.expired());
        assert_eq!(timer.remaining(), Some(Duration::from_millis(100)));
        clock.advance(Duration::from_millis(100));
        assert!(timer.expired());
    }

    #[test]
    fn clones_share_time() {
        let clock = LogicalClock::new();
        let other = clock.clone();
        other.advance(Duration::from_millis(42));
        assert_eq!(clock.now(), Duration::from_millis(42));
    }

    #[test]
    fn clock_saturates_instead_of_wrapping() {
        let clock = LogicalClock::new();
        let mut timer = clock.timer();
        timer.arm(Duration::from_millis(100));

        clock.advance(Duration::MAX);
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(u64::MAX));
        assert!(timer.expired());
    }

    #[test]
    fn monotonic_timer_with_unbounded_timeout_stays_armed() {
        let mut timer = MonotonicTimer::new();
        timer.arm(Duration::MAX);
        assert!(timer.is_armed());
        assert!(!timer.expired());

        timer.stop();
        assert!(!timer.is_armed());
    }

    #[test]
    fn monotonic_timer_expires() {
        let mut timer = MonotonicTimer::new();
        assert!(!timer.expired());

        timer.arm(Duration::ZERO);
        assert!(timer.expired());

        timer.arm(Duration::from_secs(60));
        assert!(!timer.expired());
        timer.stop();
        assert!(!timer.is_armed());
    }
}

//! Millisecond interval timers for the cooperative control loop.
//!
//! Every timed phase in the firmware stores the time it last ran and compares
//! it against the injected clock on each pass. A phase that is not due simply
//! returns and is retried on the next pass.

/// Periodic timer measured against caller-supplied timestamps.
///
/// A timer created with [`Interval::new`] is due immediately; one created with
/// [`Interval::started`] waits a full period first.
///
/// # Example
///
/// ```rust
/// use rs_plc::timer::Interval;
///
/// let mut t = Interval::started(500, 0);
/// assert!(!t.poll(499));
/// assert!(t.poll(500));
/// assert!(!t.poll(600)); // restarted at 500
/// assert!(t.poll(1000));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Interval {
    /// Creates a timer that is due on the first check.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    /// Creates a timer whose first period starts at `now_ms`.
    pub const fn started(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: Some(now_ms),
        }
    }

    /// Configured period.
    #[inline]
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Milliseconds since the last restart, `None` if never started.
    #[inline]
    pub fn elapsed(&self, now_ms: u64) -> Option<u64> {
        self.last_ms.map(|last| now_ms.saturating_sub(last))
    }

    /// True when a full period has elapsed (or the timer never started).
    #[inline]
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.elapsed(now_ms).map_or(true, |e| e >= self.period_ms)
    }

    /// Restarts the period at `now_ms`.
    #[inline]
    pub fn reset(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Makes the timer due on the next check.
    pub fn expire(&mut self) {
        self.last_ms = None;
    }

    /// Returns true and restarts the period if the timer is due.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.reset(now_ms);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_timer_is_due_immediately() {
        let t = Interval::new(1000);
        assert!(t.is_due(0));
        assert_eq!(t.elapsed(0), None);
    }

    #[test]
    fn started_timer_waits_full_period() {
        let t = Interval::started(100, 50);
        assert!(!t.is_due(149));
        assert!(t.is_due(150));
    }

    #[test]
    fn poll_restarts_period() {
        let mut t = Interval::started(100, 0);
        assert!(t.poll(120));
        assert_eq!(t.elapsed(150), Some(30));
        assert!(!t.poll(150));
    }

    #[test]
    fn clock_going_backwards_does_not_underflow() {
        let t = Interval::started(100, 500);
        assert_eq!(t.elapsed(400), Some(0));
        assert!(!t.is_due(400));
    }

    #[test]
    fn expire_makes_due() {
        let mut t = Interval::started(100, 0);
        t.expire();
        assert!(t.is_due(1));
    }
}

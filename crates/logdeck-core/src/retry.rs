//! Bounded exponential backoff for failed fetches
//!
//! Retries are user-initiated rather than automatic background polling, to
//! avoid uncontrolled request storms. A retry arms a deadline timer; the
//! event loop refetches when it elapses. Clicking retry again while a delay
//! is already armed does not stack timers.

use std::time::{Duration, Instant};

/// Fixed backoff ladder; further attempts cap at the last rung
pub const BACKOFF_LADDER: [Duration; 4] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

/// Delay before retry attempt `attempt` (0-based)
///
/// # Examples
///
/// ```
/// use logdeck_core::retry::delay_for;
/// use std::time::Duration;
///
/// assert_eq!(delay_for(0), Duration::from_secs(1));
/// assert_eq!(delay_for(3), Duration::from_secs(8));
/// assert_eq!(delay_for(9), Duration::from_secs(8));
/// ```
pub fn delay_for(attempt: u32) -> Duration {
    let idx = (attempt as usize).min(BACKOFF_LADDER.len() - 1);
    BACKOFF_LADDER[idx]
}

/// One-shot deadline timer for a scheduled retry
///
/// The timer is polled from the event loop tick; on teardown it must be
/// cancelled so nothing fires into a disposed view.
#[derive(Debug, Default)]
pub struct RetryTimer {
    deadline: Option<Instant>,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Arm the timer for `delay` from now
    ///
    /// Returns false if a delay is already armed: repeated retry requests
    /// within one window collapse to a single scheduled refetch.
    pub fn arm(&mut self, delay: Duration) -> bool {
        self.arm_at(delay, Instant::now())
    }

    /// Fire if the deadline has passed; the timer disarms on firing
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// Disarm without firing
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    fn arm_at(&mut self, delay: Duration, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + delay);
        true
    }

    fn poll_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_ladder_sequence() {
        let delays: Vec<u64> = (0..6).map(|i| delay_for(i).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_ladder_is_non_decreasing() {
        for i in 1..10 {
            assert!(delay_for(i) >= delay_for(i - 1));
        }
    }

    #[test]
    fn test_timer_fires_once() {
        let mut timer = RetryTimer::new();
        let t0 = Instant::now();

        assert!(timer.arm_at(Duration::from_secs(1), t0));
        assert!(!timer.poll_at(t0 + Duration::from_millis(500)));
        assert!(timer.poll_at(t0 + Duration::from_secs(1)));
        // Disarmed after firing
        assert!(!timer.poll_at(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_double_arm_does_not_stack() {
        // Scenario E: retry clicked twice before the first delay elapses
        let mut timer = RetryTimer::new();
        let t0 = Instant::now();

        assert!(timer.arm_at(Duration::from_secs(1), t0));
        assert!(!timer.arm_at(Duration::from_secs(1), t0 + Duration::from_millis(200)));

        // Exactly one fire per completed delay window
        assert!(timer.poll_at(t0 + Duration::from_secs(1)));
        assert!(!timer.poll_at(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn test_cancel_on_teardown() {
        let mut timer = RetryTimer::new();
        let t0 = Instant::now();
        timer.arm_at(Duration::from_secs(1), t0);
        timer.cancel();
        assert!(!timer.poll_at(t0 + Duration::from_secs(10)));
    }
}

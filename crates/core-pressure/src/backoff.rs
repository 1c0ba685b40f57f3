//! Exponential backoff schedules for bounded retries
//!
//! The schedule is pure arithmetic: `delay(n) = base * 2^n`, capped at a
//! maximum delay, with a fixed attempt budget. Sleeping is the caller's
//! business — this module only answers "how long" and "how many".

use std::time::Duration;

/// A bounded exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    /// Delay before the first retry
    pub base_delay: Duration,

    /// Ceiling applied to every computed delay
    pub max_delay: Duration,

    /// Total attempts allowed, including the first
    pub max_attempts: u32,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl BackoffSchedule {
    /// Delay before retry number `retry` (zero-based).
    ///
    /// `retry = 0` is the wait after the first failed attempt. Doubling
    /// saturates rather than overflowing, so absurd retry indices still
    /// return `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let factor = if retry >= 63 {
            u64::MAX
        } else {
            1u64 << retry
        };
        let delay_ms = base_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempts` have completed.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let s = BackoffSchedule::default();
        assert_eq!(s.base_delay, Duration::from_millis(500));
        assert_eq!(s.max_delay, Duration::from_secs(30));
        assert_eq!(s.max_attempts, 5);
    }

    #[test]
    fn test_delays_double() {
        let s = BackoffSchedule {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        };

        assert_eq!(s.delay_for(0), Duration::from_millis(100));
        assert_eq!(s.delay_for(1), Duration::from_millis(200));
        assert_eq!(s.delay_for(2), Duration::from_millis(400));
        assert_eq!(s.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_is_capped() {
        let s = BackoffSchedule {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts: 10,
        };

        assert_eq!(s.delay_for(0), Duration::from_secs(1));
        assert_eq!(s.delay_for(1), Duration::from_secs(2));
        assert_eq!(s.delay_for(2), Duration::from_secs(4));
        assert_eq!(s.delay_for(3), Duration::from_secs(5)); // 8s capped
        assert_eq!(s.delay_for(9), Duration::from_secs(5));
    }

    #[test]
    fn test_huge_retry_index_saturates() {
        let s = BackoffSchedule::default();
        assert_eq!(s.delay_for(200), s.max_delay);
        assert_eq!(s.delay_for(u32::MAX), s.max_delay);
    }

    #[test]
    fn test_allows_retry_budget() {
        let s = BackoffSchedule {
            max_attempts: 5,
            ..Default::default()
        };

        assert!(s.allows_retry(1));
        assert!(s.allows_retry(4));
        assert!(!s.allows_retry(5));
        assert!(!s.allows_retry(6));
    }
}

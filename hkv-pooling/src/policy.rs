use std::time::{Duration, Instant};

/// Recheck interval used when none is configured.
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(5);

/// How long a cached connection is trusted before its health is re-validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckPolicy {
    interval: Duration,
}

impl RecheckPolicy {
    /// Creates a policy with the given interval. Zero rechecks on every call.
    pub const fn new(interval: Duration) -> Self {
        RecheckPolicy { interval }
    }

    /// Policy that re-validates before every call.
    pub const fn always() -> Self {
        RecheckPolicy::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true once `interval` has elapsed since `last_checked_at`.
    #[inline]
    pub fn is_due(&self, last_checked_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_checked_at) >= self.interval
    }
}

impl Default for RecheckPolicy {
    fn default() -> Self {
        RecheckPolicy::new(DEFAULT_RECHECK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_seconds() {
        assert_eq!(RecheckPolicy::default().interval(), Duration::from_secs(5));
    }

    #[test]
    fn due_at_interval_boundary() {
        let policy = RecheckPolicy::new(Duration::from_secs(5));
        let start = Instant::now();
        assert!(!policy.is_due(start, start + Duration::from_secs(1)));
        assert!(policy.is_due(start, start + Duration::from_secs(5)));
        assert!(policy.is_due(start, start + Duration::from_secs(6)));
    }

    #[test]
    fn zero_interval_is_always_due() {
        let policy = RecheckPolicy::always();
        let start = Instant::now();
        assert!(policy.is_due(start, start));
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        let policy = RecheckPolicy::new(Duration::from_secs(5));
        let later = Instant::now() + Duration::from_secs(10);
        assert!(!policy.is_due(later, Instant::now()));
    }
}

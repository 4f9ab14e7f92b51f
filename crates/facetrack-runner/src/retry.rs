//! Job polling policy and failure tracking.
//!
//! Polling keeps asking for the job until it reaches a terminal state.
//! Transient failures are retried after the same delay as a regular poll.

use std::time::Duration;

use tracing::{debug, warn};

/// Default delay between job polls (3 minutes).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(180);

/// Default cap for a backed-off poll delay (30 minutes).
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(1800);

/// Configuration for job polling.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay before the second poll.
    pub interval: Duration,
    /// Maximum number of polls; `None` polls until the job finishes.
    pub max_attempts: Option<u32>,
    /// Factor applied to the delay after every poll (1.0 keeps it fixed).
    pub backoff_multiplier: f64,
    /// Maximum delay between polls.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            backoff_multiplier: 1.0,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Create a policy from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interval: std::env::var("FACETRACK_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            max_attempts: std::env::var("FACETRACK_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &u32| *n > 0),
            backoff_multiplier: std::env::var("FACETRACK_POLL_BACKOFF")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|m: &f64| m.is_finite() && *m >= 1.0)
                .unwrap_or(defaults.backoff_multiplier),
            max_interval: std::env::var("FACETRACK_POLL_MAX_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_interval),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    /// Delay to wait after the given (1-based) poll.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let secs = self.interval.as_secs_f64() * factor;

        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval.max(self.interval);
        }
        Duration::from_secs_f64(secs)
    }

    /// True once `attempt` polls have used up the budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}

/// Streak of transient job poll failures.
///
/// Each failure is logged until the streak passes `max_logged`; after that
/// only the most recent reason is kept and reported when polling recovers.
#[derive(Debug, Default)]
pub struct FailureTracker {
    streak: u32,
    max_logged: u32,
    last_failure: Option<String>,
}

impl FailureTracker {
    pub fn new(max_logged: u32) -> Self {
        Self {
            max_logged,
            ..Default::default()
        }
    }

    /// End the current streak. Returns how many failures it held.
    pub fn record_success(&mut self) -> u32 {
        let streak = std::mem::take(&mut self.streak);
        let last_failure = self.last_failure.take();

        if streak > self.max_logged {
            debug!(
                streak,
                last_failure = last_failure.as_deref().unwrap_or_default(),
                "Job polling recovered"
            );
        }
        streak
    }

    /// Record a failed poll and its reason.
    ///
    /// Returns `true` while the failure should still be logged.
    pub fn record_failure(&mut self, reason: impl Into<String>) -> bool {
        self.streak += 1;
        self.last_failure = Some(reason.into());

        if self.streak == self.max_logged + 1 {
            warn!(
                max_logged = self.max_logged,
                "Suppressing further job poll failure logs until polling recovers"
            );
        }
        self.streak <= self.max_logged
    }

    pub fn failure_count(&self) -> u32 {
        self.streak
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_polls_forever_every_three_minutes() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(180));
        assert_eq!(policy.delay_after(50), Duration::from_secs(180));
        assert!(!policy.is_exhausted(10_000));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::fixed(Duration::from_secs(10))
            .with_backoff(2.0, Duration::from_secs(60));

        assert_eq!(policy.delay_after(1), Duration::from_secs(10));
        assert_eq!(policy.delay_after(2), Duration::from_secs(20));
        assert_eq!(policy.delay_after(3), Duration::from_secs(40));
        assert_eq!(policy.delay_after(4), Duration::from_secs(60));
        assert_eq!(policy.delay_after(400), Duration::from_secs(60));
    }

    #[test]
    fn test_max_attempts() {
        let policy = PollPolicy::default().with_max_attempts(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }

    #[test]
    fn test_failure_tracker_suppression() {
        let mut tracker = FailureTracker::new(2);

        assert!(tracker.record_failure("list_jobs returned 503"));
        assert!(tracker.record_failure("list_jobs returned 503"));
        assert!(!tracker.record_failure("Network error: connection reset"));
        assert!(!tracker.record_failure("list_jobs returned 429"));
        assert_eq!(tracker.failure_count(), 4);
        assert_eq!(tracker.last_failure(), Some("list_jobs returned 429"));

        assert_eq!(tracker.record_success(), 4);
        assert_eq!(tracker.failure_count(), 0);
        assert_eq!(tracker.last_failure(), None);
        assert!(tracker.record_failure("list_jobs returned 500"));
    }

    #[test]
    fn test_success_without_failures() {
        let mut tracker = FailureTracker::new(5);
        assert_eq!(tracker.record_success(), 0);
        assert_eq!(tracker.last_failure(), None);
    }
}

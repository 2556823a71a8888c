//! Exponential backoff with jitter, generic over whatever is being retried.
//! [`execution::retry::RetryingClient`] is the concrete consumer: it holds a
//! [`BackoffPolicy`] and asks it for the delay before each broker-call retry.

use rand::Rng;
use std::time::Duration;

/// Caps the number of attempts and the delay between them. `base_delay`
/// doubles on each attempt up to `max_delay`, then a random jitter of up to
/// 25% of the capped delay is added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts, base_delay, max_delay }
    }

    /// Delay before retry attempt `attempt` (0-indexed, i.e. the delay
    /// before the *second* call is `delay(0)`).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1 << attempt.min(10));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::rng().random_range(0..=capped.as_millis().max(1) as u64 / 4);
        capped + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt_number() {
        let policy = BackoffPolicy::new(10, Duration::from_millis(100), Duration::from_secs(10));
        assert!(policy.delay(3) >= policy.delay(0));
    }

    #[test]
    fn delay_never_exceeds_max_plus_jitter_ceiling() {
        let policy = BackoffPolicy::new(10, Duration::from_millis(100), Duration::from_millis(500));
        for attempt in 0..20 {
            let delay = policy.delay(attempt);
            assert!(delay <= Duration::from_millis(500) + Duration::from_millis(125));
        }
    }

    #[test]
    fn default_policy_allows_three_attempts() {
        assert_eq!(BackoffPolicy::default().max_attempts, 3);
    }
}

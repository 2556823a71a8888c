//! [`OrderRateLimiter`] — admission chain stage 5: per-second
//! and per-minute order caps.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_per_second: u32,
    pub max_per_minute: u32,
}

#[derive(Debug, Default)]
struct RateLimiterState {
    timestamps: VecDeque<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct OrderRateLimiter {
    config: RateLimiterConfig,
    state: Mutex<RateLimiterState>,
}

impl OrderRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, state: Mutex::new(RateLimiterState::default()) }
    }

    /// Admits the order at `now` if both the per-second and per-minute
    /// caps are respected, idempotent for repeated calls with the exact
    /// same `now` — a duplicate `now` does not double-count.
    pub fn check(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock();
        state.timestamps.retain(|t| now - *t <= chrono::Duration::minutes(1));

        let already_recorded_now = state.timestamps.back() == Some(&now);

        let per_second = state.timestamps.iter().filter(|t| now - **t < chrono::Duration::seconds(1)).count();
        let per_minute = state.timestamps.len();

        let (per_second, per_minute) = if already_recorded_now {
            (per_second.saturating_sub(1), per_minute.saturating_sub(1))
        } else {
            (per_second, per_minute)
        };

        if per_second as u32 >= self.config.max_per_second || per_minute as u32 >= self.config.max_per_minute {
            return false;
        }

        if !already_recorded_now {
            state.timestamps.push_back(now);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> OrderRateLimiter {
        OrderRateLimiter::new(RateLimiterConfig { max_per_second: 2, max_per_minute: 5 })
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn admits_exactly_configured_per_second_count() {
        let lim = limiter();
        assert!(lim.check(at(0)));
        assert!(lim.check(at(0) + chrono::Duration::milliseconds(1)));
        assert!(!lim.check(at(0) + chrono::Duration::milliseconds(2)));
    }

    #[test]
    fn admits_exactly_configured_per_minute_count() {
        let lim = limiter();
        for i in 0..5 {
            assert!(lim.check(at(i * 10)));
        }
        assert!(!lim.check(at(45)));
    }

    #[test]
    fn same_timestamp_is_idempotent() {
        let lim = limiter();
        let t = at(0);
        assert!(lim.check(t));
        assert!(lim.check(t));
        assert!(lim.check(t));
    }
}

//! Time intervals a [`crate::metric::sharpe::SharpeRatio`] can be expressed
//! or rescaled in. A raw [`TimeDelta`] works for ad hoc windows; the named
//! types exist so call sites can write `SharpeRatio<Annual252>` instead of
//! re-deriving "252 trading days" at every call site.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Something that resolves to a concrete duration, used to scale a
/// per-interval statistic (like a Sharpe ratio) between intervals.
pub trait TimeInterval: Clone + std::fmt::Debug + PartialEq + PartialOrd {
    fn interval(&self) -> TimeDelta;
}

impl TimeInterval for TimeDelta {
    fn interval(&self) -> TimeDelta {
        *self
    }
}

/// One trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub struct Daily;

impl TimeInterval for Daily {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(1)
    }
}

/// A year of 252 trading days, the NSE equity-cash convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub struct Annual252;

impl TimeInterval for Annual252 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(252)
    }
}

/// A calendar year of 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub struct Annual365;

impl TimeInterval for Annual365 {
    fn interval(&self) -> TimeDelta {
        TimeDelta::days(365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_intervals_resolve_to_the_expected_duration() {
        assert_eq!(Daily.interval(), TimeDelta::days(1));
        assert_eq!(Annual252.interval(), TimeDelta::days(252));
        assert_eq!(Annual365.interval(), TimeDelta::days(365));
    }
}

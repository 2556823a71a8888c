//! Market calendar: session open/close, entry cutoff, weekends and
//! holidays.

use crate::error::RiskError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct MarketCalendar {
    timezone: Tz,
    session_open: NaiveTime,
    session_close: NaiveTime,
    entry_cutoff: NaiveTime,
    open_end: NaiveTime,
    close_start: NaiveTime,
    holidays: HashSet<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBucket {
    Open,
    Mid,
    Close,
}

impl MarketCalendar {
    pub fn new(
        timezone: &str,
        session_open: &str,
        session_close: &str,
        entry_cutoff: &str,
        open_end: &str,
        close_start: &str,
        holidays: &[String],
    ) -> Result<Self, RiskError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| RiskError::InvalidCalendarTime(timezone.to_string()))?;
        let holidays = holidays
            .iter()
            .map(|h| {
                NaiveDate::parse_from_str(h, "%Y-%m-%d")
                    .map_err(|_| RiskError::InvalidCalendarTime(h.clone()))
            })
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self {
            timezone: tz,
            session_open: parse_time(session_open)?,
            session_close: parse_time(session_close)?,
            entry_cutoff: parse_time(entry_cutoff)?,
            open_end: parse_time(open_end)?,
            close_start: parse_time(close_start)?,
            holidays,
        })
    }

    fn local(&self, now: DateTime<Utc>) -> chrono::DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    pub fn is_trading_day(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        !matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
            && !self.holidays.contains(&local.date_naive())
    }

    pub fn is_within_session(&self, now: DateTime<Utc>) -> bool {
        if !self.is_trading_day(now) {
            return false;
        }
        let t = self.local(now).time();
        t >= self.session_open && t <= self.session_close
    }

    /// Entries are allowed when the session is open and `now` is at or
    /// before the entry cutoff.
    pub fn allows_entry(&self, now: DateTime<Utc>) -> bool {
        self.is_within_session(now) && self.local(now).time() <= self.entry_cutoff
    }

    /// Coarse session phase used by the [`AdaptiveOptimizer`](crate::optimizer::AdaptiveOptimizer)'s
    /// time-bucketed rolling windows.
    pub fn bucket(&self, now: DateTime<Utc>) -> SessionBucket {
        let t = self.local(now).time();
        if t < self.open_end {
            SessionBucket::Open
        } else if t >= self.close_start {
            SessionBucket::Close
        } else {
            SessionBucket::Mid
        }
    }

    pub fn minutes_since_open(&self, now: DateTime<Utc>) -> i64 {
        let t = self.local(now).time();
        (t - self.session_open).num_minutes()
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, RiskError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| RiskError::InvalidCalendarTime(raw.to_string()))
}

impl FromStr for SessionBucket {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "MID" => Ok(Self::Mid),
            "CLOSE" => Ok(Self::Close),
            _ => Err(()),
        }
    }
}

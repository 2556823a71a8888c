//! Data-quality checks run over a candle series before it is fed to
//! [`crate::backtest::BacktestHarness`]: non-monotonic timestamps,
//! misaligned intervals, intra-session gaps, and candles stamped outside
//! the trading session. Each check produces an [`Issue`]; [`DataQualityMode`]
//! decides whether issues are ignored, logged, or turned into a hard error.

use chrono::Duration;
use ixtrade_data::Candle;
use ixtrade_risk::MarketCalendar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How strictly a loaded candle series is checked before a backtest runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityMode {
    /// Run no checks at all.
    Off,
    /// Run checks, log every issue, proceed anyway.
    #[default]
    Warn,
    /// Run checks, refuse to run the backtest if any issue is found.
    Strict,
}

/// One data-quality defect found in a candle series, anchored to the index
/// of the candle where it was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Issue {
    /// `candles[index].timestamp <= candles[index - 1].timestamp`.
    NonMonotonicTimestamp { index: usize },
    /// `candles[index].timestamp` does not fall on an `interval_minutes`
    /// boundary relative to the series' first timestamp.
    MisalignedInterval { index: usize },
    /// A gap between `candles[index - 1]` and `candles[index]` larger than
    /// one interval, both candles inside the trading session.
    IntraSessionGap { index: usize, missing_candles: u32 },
    /// `candles[index].timestamp` falls outside the configured session.
    OutOfSession { index: usize },
}

/// A [`DataQualityMode::Strict`] run found at least one [`Issue`].
#[derive(Debug, Error)]
#[error("{} data quality issue(s) found: {issues:?}", issues.len())]
pub struct QualityError {
    pub issues: Vec<Issue>,
}

/// Runs every check over `candles` and returns every [`Issue`] found, in
/// candle order. Checks assume `candles` all share one `instrument_token`.
pub fn scan(candles: &[Candle], calendar: &MarketCalendar) -> Vec<Issue> {
    let mut issues = Vec::new();
    if candles.is_empty() {
        return issues;
    }

    let interval = Duration::minutes(i64::from(candles[0].interval_minutes));

    for (index, candle) in candles.iter().enumerate() {
        if !calendar.is_within_session(candle.timestamp) {
            issues.push(Issue::OutOfSession { index });
        }

        if index == 0 {
            continue;
        }

        let prev = &candles[index - 1];
        if candle.timestamp <= prev.timestamp {
            issues.push(Issue::NonMonotonicTimestamp { index });
            continue;
        }

        let elapsed = candle.timestamp - prev.timestamp;
        let elapsed_minutes = elapsed.num_minutes().max(0) % i64::from(candle.interval_minutes);
        if elapsed_minutes != 0 {
            issues.push(Issue::MisalignedInterval { index });
        }

        if elapsed > interval && calendar.is_within_session(prev.timestamp) {
            let missing = (elapsed.num_seconds() / interval.num_seconds().max(1)) - 1;
            if missing > 0 {
                issues.push(Issue::IntraSessionGap {
                    index,
                    missing_candles: missing as u32,
                });
            }
        }
    }

    issues
}

/// Applies `mode` to the result of [`scan`]: `Off` returns `Ok(())`
/// unconditionally, `Warn` logs and returns `Ok(())`, `Strict` returns
/// [`QualityError`] if any issue was found.
pub fn enforce(
    mode: DataQualityMode,
    candles: &[Candle],
    calendar: &MarketCalendar,
) -> Result<Vec<Issue>, QualityError> {
    if mode == DataQualityMode::Off {
        return Ok(Vec::new());
    }

    let issues = scan(candles, calendar);
    if issues.is_empty() {
        return Ok(issues);
    }

    match mode {
        DataQualityMode::Off => Ok(Vec::new()),
        DataQualityMode::Warn => {
            for issue in &issues {
                tracing::warn!(?issue, "data quality issue in backtest candle series");
            }
            Ok(issues)
        }
        DataQualityMode::Strict => Err(QualityError { issues }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use ixtrade_data::candle::CandleSource;
    use ixtrade_markets::instrument::InstrumentToken;
    use rust_decimal_macros::dec;

    fn calendar() -> MarketCalendar {
        MarketCalendar::new("Asia/Kolkata", "09:15", "15:30", "15:00", "09:30", "15:00", &[]).unwrap()
    }

    fn session_open() -> DateTime<Utc> {
        // 09:15 IST on a Monday == 03:45 UTC
        Utc.with_ymd_and_hms(2024, 1, 1, 3, 45, 0).unwrap()
    }

    fn candle_at(token: InstrumentToken, ts: DateTime<Utc>, interval: u32) -> Candle {
        Candle::new(
            token,
            interval,
            ts,
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100),
            1_000,
            CandleSource::Historical,
        )
        .unwrap()
    }

    #[test]
    fn clean_series_has_no_issues() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open(), 5),
            candle_at(token, session_open() + Duration::minutes(5), 5),
            candle_at(token, session_open() + Duration::minutes(10), 5),
        ];
        assert!(scan(&candles, &calendar()).is_empty());
    }

    #[test]
    fn detects_non_monotonic_timestamp() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open() + Duration::minutes(5), 5),
            candle_at(token, session_open(), 5),
        ];
        let issues = scan(&candles, &calendar());
        assert!(issues.contains(&Issue::NonMonotonicTimestamp { index: 1 }));
    }

    #[test]
    fn detects_an_intra_session_gap() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open(), 5),
            candle_at(token, session_open() + Duration::minutes(20), 5),
        ];
        let issues = scan(&candles, &calendar());
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::IntraSessionGap { index: 1, missing_candles: 3 })));
    }

    #[test]
    fn detects_out_of_session_candle() {
        let token = InstrumentToken(1);
        let before_open = session_open() - Duration::hours(2);
        let candles = vec![candle_at(token, before_open, 5)];
        let issues = scan(&candles, &calendar());
        assert!(issues.contains(&Issue::OutOfSession { index: 0 }));
    }

    #[test]
    fn off_mode_skips_every_check() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open() + Duration::minutes(5), 5),
            candle_at(token, session_open(), 5),
        ];
        assert!(enforce(DataQualityMode::Off, &candles, &calendar())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn strict_mode_errors_on_any_issue() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open() + Duration::minutes(5), 5),
            candle_at(token, session_open(), 5),
        ];
        let err = enforce(DataQualityMode::Strict, &candles, &calendar()).unwrap_err();
        assert!(!err.issues.is_empty());
    }

    #[test]
    fn warn_mode_reports_but_does_not_error() {
        let token = InstrumentToken(1);
        let candles = vec![
            candle_at(token, session_open() + Duration::minutes(5), 5),
            candle_at(token, session_open(), 5),
        ];
        let issues = enforce(DataQualityMode::Warn, &candles, &calendar()).unwrap();
        assert!(!issues.is_empty());
    }
}

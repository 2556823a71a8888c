//! The [`Candle`] type.

use crate::error::DataError;
use chrono::{DateTime, Utc};
use ixtrade_markets::instrument::InstrumentToken;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Provenance of a candle row. Synthetic candles are backtest-only filler
/// used to bridge gaps; the signal pipeline rejects them unless explicitly
/// allowed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CandleSource {
    Live,
    Historical,
    Synthetic,
}

/// One OHLCV row. Invariant: `(instrument_token, timestamp)` is
/// unique; `high >= max(open, close)`; `low <= min(open, close)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub instrument_token: InstrumentToken,
    pub interval_minutes: u32,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub source: CandleSource,
}

impl Candle {
    pub fn new(
        instrument_token: InstrumentToken,
        interval_minutes: u32,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
        source: CandleSource,
    ) -> Result<Self, DataError> {
        let candle = Self {
            instrument_token,
            interval_minutes,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            source,
        };
        candle.validate()?;
        Ok(candle)
    }

    fn validate(&self) -> Result<(), DataError> {
        let max_oc = self.open.max(self.close);
        let min_oc = self.open.min(self.close);
        if self.high < max_oc {
            return Err(DataError::InvalidOhlc {
                token: self.instrument_token,
                ts: self.timestamp.timestamp(),
                detail: format!("high {} < max(open,close) {}", self.high, max_oc),
            });
        }
        if self.low > min_oc {
            return Err(DataError::InvalidOhlc {
                token: self.instrument_token,
                ts: self.timestamp.timestamp(),
                detail: format!("low {} > min(open,close) {}", self.low, min_oc),
            });
        }
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        matches!(self.source, CandleSource::Live)
    }

    /// Upserts a new price into this candle's running extremes and volume,
    /// the update applied on every tick while the bucket is open.
    pub fn apply_tick(&mut self, price: Decimal, volume_delta: u64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume_delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn rejects_high_below_open_close() {
        let err = Candle::new(
            InstrumentToken(1),
            1,
            ts(0),
            dec!(100),
            dec!(99),
            dec!(95),
            dec!(98),
            10,
            CandleSource::Live,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidOhlc { .. }));
    }

    #[test]
    fn rejects_low_above_open_close() {
        let err = Candle::new(
            InstrumentToken(1),
            1,
            ts(0),
            dec!(100),
            dec!(105),
            dec!(101),
            dec!(98),
            10,
            CandleSource::Live,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidOhlc { .. }));
    }

    #[test]
    fn apply_tick_extends_extremes_and_accumulates_volume() {
        let mut candle = Candle::new(
            InstrumentToken(1),
            1,
            ts(0),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            10,
            CandleSource::Live,
        )
        .unwrap();
        candle.apply_tick(dec!(101), 5);
        candle.apply_tick(dec!(99), 3);
        assert_eq!(candle.high, dec!(101));
        assert_eq!(candle.low, dec!(99));
        assert_eq!(candle.close, dec!(99));
        assert_eq!(candle.volume, 18);
    }
}

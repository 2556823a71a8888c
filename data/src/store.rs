//! `CandleStore` — durable OHLCV storage keyed by `(instrument, timestamp)`,
//! with TTL retention, idempotent via a unique (token, ts) index.

use crate::candle::Candle;
use chrono::{DateTime, Duration, Utc};
use ixtrade_markets::instrument::InstrumentToken;
use std::collections::BTreeMap;

/// Persistence boundary for candles. A real deployment backs this with the
/// document store (per-collection upsert by unique key,
/// TTL index); this in-memory implementation has the same semantics and is
/// what the backtest harness and unit tests run against.
pub trait CandleStore: Send + Sync {
    /// Upsert is idempotent: writing the same `(token, ts)` twice leaves a
    /// single row reflecting the latest write.
    fn upsert(&mut self, candle: Candle);

    fn range(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Candle>;

    fn latest(&self, token: InstrumentToken, interval_minutes: u32) -> Option<Candle>;

    /// Drops rows older than their configured TTL relative to `now`.
    fn gc(&mut self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key {
    token: InstrumentToken,
    interval_minutes: u32,
    timestamp_millis: i64,
}

/// In-memory [`CandleStore`] backed by a sorted map, so range queries are a
/// contiguous slice rather than a linear scan.
pub struct InMemoryCandleStore {
    rows: BTreeMap<Key, Candle>,
    ttl: Duration,
}

impl InMemoryCandleStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            rows: BTreeMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn key_for(candle: &Candle) -> Key {
    Key {
        token: candle.instrument_token,
        interval_minutes: candle.interval_minutes,
        timestamp_millis: candle.timestamp.timestamp_millis(),
    }
}

impl CandleStore for InMemoryCandleStore {
    fn upsert(&mut self, candle: Candle) {
        self.rows.insert(key_for(&candle), candle);
    }

    fn range(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Candle> {
        let lo = Key {
            token,
            interval_minutes,
            timestamp_millis: from.timestamp_millis(),
        };
        let hi = Key {
            token,
            interval_minutes,
            timestamp_millis: to.timestamp_millis(),
        };
        self.rows
            .range(lo..=hi)
            .filter(|(k, _)| k.token == token && k.interval_minutes == interval_minutes)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn latest(&self, token: InstrumentToken, interval_minutes: u32) -> Option<Candle> {
        self.rows
            .iter()
            .rev()
            .find(|(k, _)| k.token == token && k.interval_minutes == interval_minutes)
            .map(|(_, c)| c.clone())
    }

    fn gc(&mut self, now: DateTime<Utc>) {
        let cutoff = (now - self.ttl).timestamp_millis();
        self.rows.retain(|k, _| k.timestamp_millis >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::CandleSource;
    use rust_decimal_macros::dec;

    fn candle(ts_secs: i64, close: rust_decimal::Decimal) -> Candle {
        Candle::new(
            InstrumentToken(1),
            1,
            DateTime::from_timestamp(ts_secs, 0).unwrap(),
            close,
            close,
            close,
            close,
            1,
            CandleSource::Live,
        )
        .unwrap()
    }

    #[test]
    fn upsert_same_key_twice_keeps_one_row_with_latest_fields() {
        let mut store = InMemoryCandleStore::new(Duration::days(30));
        store.upsert(candle(60, dec!(100)));
        store.upsert(candle(60, dec!(105)));
        assert_eq!(store.len(), 1);
        let latest = store.latest(InstrumentToken(1), 1).unwrap();
        assert_eq!(latest.close, dec!(105));
    }

    #[test]
    fn range_returns_rows_within_bounds_only() {
        let mut store = InMemoryCandleStore::new(Duration::days(30));
        for secs in [60, 120, 180, 240] {
            store.upsert(candle(secs, dec!(100)));
        }
        let rows = store.range(
            InstrumentToken(1),
            1,
            DateTime::from_timestamp(120, 0).unwrap(),
            DateTime::from_timestamp(180, 0).unwrap(),
        );
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn gc_drops_rows_older_than_ttl() {
        let mut store = InMemoryCandleStore::new(Duration::seconds(100));
        store.upsert(candle(0, dec!(100)));
        store.upsert(candle(1_000, dec!(101)));
        store.gc(DateTime::from_timestamp(1_000, 0).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest(InstrumentToken(1), 1).unwrap().close, dec!(101));
    }
}

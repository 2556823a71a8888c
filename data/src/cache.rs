//! `CandleCache` — per-(instrument, interval) in-memory ring of recent
//! candles. Bounded so the signal pipeline's "last K candles"
//! lookback never re-reads the durable store on the hot path.

use crate::candle::Candle;
use ixtrade_markets::instrument::InstrumentToken;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct CacheKey {
    token: InstrumentToken,
    interval_minutes: u32,
}

pub struct CandleCache {
    capacity: usize,
    rings: HashMap<CacheKey, VecDeque<Candle>>,
}

impl CandleCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rings: HashMap::new(),
        }
    }

    /// Appends a finalized candle, dropping the oldest entry once the ring
    /// is at capacity.
    pub fn push(&mut self, candle: Candle) {
        let key = CacheKey {
            token: candle.instrument_token,
            interval_minutes: candle.interval_minutes,
        };
        let ring = self.rings.entry(key).or_insert_with(VecDeque::new);
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(candle);
    }

    /// Returns up to `n` most recent candles, oldest first — the shape the
    /// signal pipeline and strategies expect.
    pub fn recent(&self, token: InstrumentToken, interval_minutes: u32, n: usize) -> Vec<&Candle> {
        let key = CacheKey {
            token,
            interval_minutes,
        };
        match self.rings.get(&key) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn len(&self, token: InstrumentToken, interval_minutes: u32) -> usize {
        let key = CacheKey {
            token,
            interval_minutes,
        };
        self.rings.get(&key).map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::CandleSource;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn candle(secs: i64) -> Candle {
        Candle::new(
            InstrumentToken(7),
            5,
            DateTime::from_timestamp(secs, 0).unwrap(),
            dec!(10),
            dec!(10),
            dec!(10),
            dec!(10),
            1,
            CandleSource::Live,
        )
        .unwrap()
    }

    #[test]
    fn ring_drops_oldest_beyond_capacity() {
        let mut cache = CandleCache::new(3);
        for secs in [0, 300, 600, 900] {
            cache.push(candle(secs));
        }
        let recent = cache.recent(InstrumentToken(7), 5, 10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].timestamp.timestamp(), 300);
        assert_eq!(recent[2].timestamp.timestamp(), 900);
    }

    #[test]
    fn recent_caps_to_requested_n() {
        let mut cache = CandleCache::new(10);
        for secs in [0, 300, 600] {
            cache.push(candle(secs));
        }
        assert_eq!(cache.recent(InstrumentToken(7), 5, 2).len(), 2);
    }

    #[test]
    fn unknown_key_returns_empty() {
        let cache = CandleCache::new(10);
        assert!(cache.recent(InstrumentToken(99), 1, 5).is_empty());
    }
}

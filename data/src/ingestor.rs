//! `TickIngestor` — batches broker ticks, maintains the LTP cache, and
//! synthesizes live candles with bucket rollover.

use crate::cache::CandleCache;
use crate::candle::{Candle, CandleSource};
use crate::queue::TickQueue;
use crate::store::CandleStore;
use crate::tick::{IngestEvent, Tick, TickBatch};
use chrono::{DateTime, Duration, Utc};
use ixtrade_markets::instrument::InstrumentToken;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Narrow capability the ingestor needs from the broker layer: re-subscribe
/// tokens whose tick stream went idle, or the full set after a reconnect.
/// Kept separate from the execution crate's broker adapter trait so `data`
/// never depends on `execution` (each
/// component talks to its neighbours through a minimal mailbox-shaped
/// interface, not the whole broker surface).
pub trait TokenResubscriber: Send + Sync {
    fn resubscribe(&self, tokens: &[InstrumentToken]);
}

#[derive(Debug, Clone, Copy)]
struct LiveCandleKey {
    token: InstrumentToken,
    interval_minutes: u32,
}

/// Floors `ts` to the start of its `interval_minutes` bucket.
fn bucket_start(ts: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let interval_secs = i64::from(interval_minutes) * 60;
    let epoch_secs = ts.timestamp();
    let floored = (epoch_secs / interval_secs) * interval_secs;
    DateTime::from_timestamp(floored, 0).unwrap_or(ts)
}

pub struct TickIngestor<S: CandleStore> {
    queue: Arc<TickQueue>,
    ltp: RwLock<HashMap<InstrumentToken, rust_decimal::Decimal>>,
    last_tick_at: RwLock<HashMap<InstrumentToken, DateTime<Utc>>>,
    live_candles: Mutex<HashMap<(InstrumentToken, u32), Candle>>,
    intervals_by_token: RwLock<HashMap<InstrumentToken, Vec<u32>>>,
    store: Arc<Mutex<S>>,
    cache: Arc<Mutex<CandleCache>>,
    events: UnboundedSender<IngestEvent>,
    idle_threshold: Duration,
}

impl<S: CandleStore> TickIngestor<S> {
    pub fn new(
        queue_capacity: usize,
        store: Arc<Mutex<S>>,
        cache: Arc<Mutex<CandleCache>>,
        events: UnboundedSender<IngestEvent>,
        idle_threshold: Duration,
    ) -> (Arc<Self>, Arc<TickQueue>) {
        let queue = Arc::new(TickQueue::new(queue_capacity));
        let ingestor = Arc::new(Self {
            queue: queue.clone(),
            ltp: RwLock::new(HashMap::new()),
            last_tick_at: RwLock::new(HashMap::new()),
            live_candles: Mutex::new(HashMap::new()),
            intervals_by_token: RwLock::new(HashMap::new()),
            store,
            cache,
            events,
            idle_threshold,
        });
        (ingestor, queue)
    }

    /// Registers which candle intervals to aggregate for `token`. Called
    /// once on subscribe and again on reconnect recovery.
    pub fn track_intervals(&self, token: InstrumentToken, intervals: Vec<u32>) {
        self.intervals_by_token.write().insert(token, intervals);
    }

    /// Broker callback entry point: non-blocking `onTicks` handler.
    pub fn on_ticks(&self, ticks: Vec<Tick>) {
        self.queue.push(TickBatch {
            received_at: Utc::now(),
            ticks,
        });
    }

    pub fn ltp(&self, token: InstrumentToken) -> Option<rust_decimal::Decimal> {
        self.ltp.read().get(&token).copied()
    }

    /// Single-consumer drain loop. Intended to be spawned once as a tokio
    /// task; there is never more than one writer to `live_candles`.
    pub async fn run(self: Arc<Self>) {
        loop {
            let batch = self.queue.pop().await;
            for tick in batch.ticks {
                self.process_tick(tick, batch.received_at);
            }
        }
    }

    fn process_tick(&self, tick: Tick, received_at: DateTime<Utc>) {
        let ts = tick.exchange_timestamp.unwrap_or(received_at);
        self.ltp.write().insert(tick.instrument_token, tick.last_price);
        self.last_tick_at.write().insert(tick.instrument_token, ts);
        let _ = self.events.send(IngestEvent::Tick {
            token: tick.instrument_token,
            last_price: tick.last_price,
        });

        let intervals = self
            .intervals_by_token
            .read()
            .get(&tick.instrument_token)
            .cloned()
            .unwrap_or_default();

        for interval_minutes in intervals {
            self.apply_tick_to_bucket(tick.instrument_token, interval_minutes, &tick, ts);
        }
    }

    fn apply_tick_to_bucket(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        tick: &Tick,
        ts: DateTime<Utc>,
    ) {
        let bucket = bucket_start(ts, interval_minutes);
        let volume_delta = tick.volume_delta.unwrap_or(0);
        let key = (token, interval_minutes);
        let mut live = self.live_candles.lock();

        enum Action {
            Applied,
            RolledOver(Candle),
            Opened,
            LateForClosedBucket,
        }

        let action = match live.get_mut(&key) {
            Some(candle) if candle.timestamp == bucket => {
                candle.apply_tick(tick.last_price, volume_delta);
                Action::Applied
            }
            Some(candle) if bucket > candle.timestamp => {
                let finished = std::mem::replace(
                    candle,
                    Candle::new(
                        token,
                        interval_minutes,
                        bucket,
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                        volume_delta,
                        CandleSource::Live,
                    )
                    .expect("new live candle with open==high==low==close is always valid"),
                );
                Action::RolledOver(finished)
            }
            // Tick timestamped before the current live bucket: does not
            // roll back the live candle, the already-closed row in the
            // store is amended instead (late ticks update
            // the bucket whose timestamp they belong to").
            Some(_) => Action::LateForClosedBucket,
            None => {
                live.insert(
                    key,
                    Candle::new(
                        token,
                        interval_minutes,
                        bucket,
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                        tick.last_price,
                        volume_delta,
                        CandleSource::Live,
                    )
                    .expect("new live candle with open==high==low==close is always valid"),
                );
                Action::Opened
            }
        };
        drop(live);

        match action {
            Action::Applied | Action::Opened => {}
            Action::RolledOver(finished) => self.finalize_candle(finished),
            Action::LateForClosedBucket => {
                self.amend_closed_bucket(token, interval_minutes, bucket, tick.last_price, volume_delta);
                debug!(?token, interval_minutes, "late tick amended a closed bucket");
            }
        }
    }

    fn amend_closed_bucket(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        bucket: DateTime<Utc>,
        price: rust_decimal::Decimal,
        volume_delta: u64,
    ) {
        let mut store = self.store.lock();
        if let Some(mut existing) = store
            .range(token, interval_minutes, bucket, bucket)
            .into_iter()
            .next()
        {
            existing.apply_tick(price, volume_delta);
            store.upsert(existing.clone());
            drop(store);
            self.cache.lock().push(existing.clone());
            let _ = self.events.send(IngestEvent::CandleClose { candle: existing });
        }
    }

    fn finalize_candle(&self, candle: Candle) {
        self.store.lock().upsert(candle.clone());
        self.cache.lock().push(candle.clone());
        info!(
            token = candle.instrument_token.0,
            interval = candle.interval_minutes,
            close = %candle.close,
            "candle close"
        );
        let _ = self.events.send(IngestEvent::CandleClose { candle });
    }

    /// Tick watchdog check: tokens idle past `idle_threshold`
    /// are handed to `resubscriber` for re-subscription.
    pub fn check_idle_tokens(&self, now: DateTime<Utc>, resubscriber: &dyn TokenResubscriber) {
        let stale: Vec<InstrumentToken> = self
            .last_tick_at
            .read()
            .iter()
            .filter(|(_, &last)| now - last > self.idle_threshold)
            .map(|(&token, _)| token)
            .collect();
        if !stale.is_empty() {
            resubscriber.resubscribe(&stale);
        }
    }

    /// Reconnect handler: re-subscribe every tracked token.
    pub fn resubscribe_all(&self, resubscriber: &dyn TokenResubscriber) {
        let tokens: Vec<InstrumentToken> =
            self.intervals_by_token.read().keys().copied().collect();
        resubscriber.resubscribe(&tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCandleStore;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc::unbounded_channel;

    struct RecordingResubscriber {
        seen: Mutex<Vec<InstrumentToken>>,
    }

    impl TokenResubscriber for RecordingResubscriber {
        fn resubscribe(&self, tokens: &[InstrumentToken]) {
            self.seen.lock().extend_from_slice(tokens);
        }
    }

    fn new_ingestor() -> (
        Arc<TickIngestor<InMemoryCandleStore>>,
        tokio::sync::mpsc::UnboundedReceiver<IngestEvent>,
    ) {
        let store = Arc::new(Mutex::new(InMemoryCandleStore::new(Duration::days(30))));
        let cache = Arc::new(Mutex::new(CandleCache::new(100)));
        let (tx, rx) = unbounded_channel();
        let (ingestor, _queue) = TickIngestor::new(1024, store, cache, tx, Duration::seconds(30));
        (ingestor, rx)
    }

    #[test]
    fn bucket_start_floors_to_interval() {
        let ts = DateTime::from_timestamp(125, 0).unwrap();
        assert_eq!(bucket_start(ts, 1).timestamp(), 60);
        assert_eq!(bucket_start(ts, 5).timestamp(), 0);
    }

    #[test]
    fn first_tick_opens_live_candle_without_closing() {
        let (ingestor, mut rx) = new_ingestor();
        ingestor.track_intervals(InstrumentToken(1), vec![1]);
        ingestor.process_tick(
            Tick {
                instrument_token: InstrumentToken(1),
                last_price: dec!(100),
                exchange_timestamp: Some(DateTime::from_timestamp(10, 0).unwrap()),
                volume_delta: Some(5),
                depth: None,
            },
            Utc::now(),
        );
        assert_eq!(ingestor.ltp(InstrumentToken(1)), Some(dec!(100)));
        assert!(rx.try_recv().is_ok()); // Tick event
        assert!(rx.try_recv().is_err()); // no candle close yet
    }

    #[test]
    fn crossing_bucket_boundary_emits_candle_close() {
        let (ingestor, mut rx) = new_ingestor();
        ingestor.track_intervals(InstrumentToken(1), vec![1]);
        ingestor.process_tick(
            Tick {
                instrument_token: InstrumentToken(1),
                last_price: dec!(100),
                exchange_timestamp: Some(DateTime::from_timestamp(10, 0).unwrap()),
                volume_delta: Some(1),
                depth: None,
            },
            Utc::now(),
        );
        ingestor.process_tick(
            Tick {
                instrument_token: InstrumentToken(1),
                last_price: dec!(103),
                exchange_timestamp: Some(DateTime::from_timestamp(65, 0).unwrap()),
                volume_delta: Some(1),
                depth: None,
            },
            Utc::now(),
        );
        let mut saw_close = false;
        while let Ok(evt) = rx.try_recv() {
            if let IngestEvent::CandleClose { candle } = evt {
                saw_close = true;
                assert_eq!(candle.close, dec!(100));
                assert_eq!(candle.timestamp.timestamp(), 0);
            }
        }
        assert!(saw_close);
    }

    #[test]
    fn idle_watchdog_resubscribes_stale_tokens_only() {
        let (ingestor, _rx) = new_ingestor();
        ingestor.track_intervals(InstrumentToken(1), vec![1]);
        ingestor.track_intervals(InstrumentToken(2), vec![1]);
        ingestor.process_tick(
            Tick {
                instrument_token: InstrumentToken(1),
                last_price: dec!(100),
                exchange_timestamp: Some(DateTime::from_timestamp(0, 0).unwrap()),
                volume_delta: None,
                depth: None,
            },
            Utc::now(),
        );
        let resub = RecordingResubscriber {
            seen: Mutex::new(vec![]),
        };
        ingestor.check_idle_tokens(DateTime::from_timestamp(100, 0).unwrap(), &resub);
        let seen = resub.seen.lock();
        assert_eq!(*seen, vec![InstrumentToken(1)]);
    }
}

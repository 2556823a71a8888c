//! Order-update deduplication: the same `(orderId, status,
//! exchange_timestamp)` triple can arrive more than once from the broker's
//! event stream (reconnect replay, at-least-once delivery); the trade
//! update serializer must drive the state machine from it only once.

use crate::order::{BrokerOrderId, OrderStatus, OrderUpdate};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    order_id: BrokerOrderId,
    status: OrderStatus,
    exchange_timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct OrderUpdateDedup {
    ttl: Duration,
    seen: HashMap<DedupKey, DateTime<Utc>>,
}

impl OrderUpdateDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: HashMap::new(),
        }
    }

    /// Returns `true` the first time this `(orderId, status,
    /// exchange_timestamp)` is seen within the TTL window, `false` on a
    /// replay. Evicts entries older than `ttl` on every call.
    pub fn admit(&mut self, update: &OrderUpdate, now: DateTime<Utc>) -> bool {
        self.seen.retain(|_, seen_at| now - *seen_at <= self.ttl);

        let key = DedupKey {
            order_id: update.broker_order_id.clone(),
            status: update.status,
            exchange_timestamp: update.exchange_timestamp,
        };
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixtrade_markets::InstrumentToken;
    use rust_decimal::Decimal;

    fn update(ts_secs: i64) -> OrderUpdate {
        OrderUpdate {
            broker_order_id: BrokerOrderId("B1".into()),
            client_order_id: None,
            instrument_token: InstrumentToken(1),
            status: OrderStatus::Filled,
            filled_quantity: Decimal::from(10),
            average_price: None,
            rejection_message: None,
            exchange_timestamp: DateTime::from_timestamp(ts_secs, 0).unwrap(),
        }
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let mut dedup = OrderUpdateDedup::new(Duration::seconds(30));
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(dedup.admit(&update(100), now));
        assert!(!dedup.admit(&update(100), now));
    }

    #[test]
    fn different_timestamp_is_a_distinct_update() {
        let mut dedup = OrderUpdateDedup::new(Duration::seconds(30));
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(dedup.admit(&update(100), now));
        assert!(dedup.admit(&update(101), now));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let mut dedup = OrderUpdateDedup::new(Duration::seconds(30));
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(dedup.admit(&update(100), t0));
        let later = t0 + Duration::seconds(31);
        assert!(dedup.admit(&update(100), later));
    }
}

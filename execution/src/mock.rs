//! An in-memory [`BrokerAdapter`] used by the backtest harness and by tests
//! that exercise the admission chain and trade lifecycle without a live
//! broker connection.

use crate::adapter::{BrokerAdapter, BrokerEvent};
use crate::error::ExecutionError;
use crate::order::{
    BrokerOrderId, ClientOrderId, Margins, ModifyOrderParams, OrderStatus, OrderUpdate,
    PlaceOrderParams, Position, Quote, SubscriptionMode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ixtrade_data::Candle;
use ixtrade_markets::{ExchangeId, Instrument, InstrumentToken};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub struct MockBrokerAdapter {
    next_id: AtomicU64,
    ltp: Mutex<std::collections::HashMap<InstrumentToken, Decimal>>,
    tx: mpsc::UnboundedSender<BrokerEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<BrokerEvent>>>,
}

impl Default for MockBrokerAdapter {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            next_id: AtomicU64::new(1),
            ltp: Mutex::new(std::collections::HashMap::new()),
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }
}

impl MockBrokerAdapter {
    pub fn set_ltp(&self, token: InstrumentToken, price: Decimal) {
        self.ltp.lock().insert(token, price);
    }

    /// Pushes a synthetic [`BrokerEvent`] as though the broker sent it.
    pub fn push_event(&self, event: BrokerEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl BrokerAdapter for MockBrokerAdapter {
    fn events(&self) -> mpsc::UnboundedReceiver<BrokerEvent> {
        self.rx.lock().take().unwrap_or_else(|| mpsc::unbounded_channel().1)
    }

    async fn subscribe(&self, _tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn unsubscribe(&self, _tokens: &[InstrumentToken]) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn set_mode(
        &self,
        _tokens: &[InstrumentToken],
        _mode: SubscriptionMode,
    ) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn place_order(&self, params: PlaceOrderParams) -> Result<BrokerOrderId, ExecutionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let broker_order_id = BrokerOrderId(format!("MOCK-{id}"));
        let fill_price = self
            .ltp
            .lock()
            .get(&params.instrument_token)
            .copied()
            .or(params.price)
            .unwrap_or(Decimal::ZERO);
        self.push_event(BrokerEvent::OrderUpdate(OrderUpdate {
            broker_order_id: broker_order_id.clone(),
            client_order_id: Some(ClientOrderId(params.client_order_id.0.clone())),
            instrument_token: params.instrument_token,
            status: OrderStatus::Filled,
            filled_quantity: params.quantity,
            average_price: Some(fill_price),
            rejection_message: None,
            exchange_timestamp: Utc::now(),
        }));
        Ok(broker_order_id)
    }

    async fn modify_order(&self, _params: ModifyOrderParams) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn cancel_order(&self, _id: &BrokerOrderId) -> Result<(), ExecutionError> {
        Ok(())
    }

    async fn get_orders(&self) -> Result<Vec<OrderUpdate>, ExecutionError> {
        Ok(vec![])
    }

    async fn get_order_history(
        &self,
        _id: &BrokerOrderId,
    ) -> Result<Vec<OrderUpdate>, ExecutionError> {
        Ok(vec![])
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExecutionError> {
        Ok(vec![])
    }

    async fn get_margins(&self) -> Result<Margins, ExecutionError> {
        Ok(Margins { available: Decimal::from(1_000_000), used: Decimal::ZERO })
    }

    async fn get_instruments(&self, _exchange: ExchangeId) -> Result<Vec<Instrument>, ExecutionError> {
        Ok(vec![])
    }

    async fn get_historical_data(
        &self,
        _token: InstrumentToken,
        _interval_minutes: u32,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, ExecutionError> {
        Ok(vec![])
    }

    async fn get_quote(&self, token: InstrumentToken) -> Result<Quote, ExecutionError> {
        let last_price = self.ltp.lock().get(&token).copied().unwrap_or(Decimal::ZERO);
        Ok(Quote { bid: last_price, ask: last_price, last_price })
    }

    async fn get_ltp(&self, token: InstrumentToken) -> Result<Decimal, ExecutionError> {
        Ok(self.ltp.lock().get(&token).copied().unwrap_or(Decimal::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderKind, TimeInForce};
    use ixtrade_markets::Side;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn place_order_fills_immediately_at_mock_ltp() {
        let adapter = MockBrokerAdapter::default();
        adapter.set_ltp(InstrumentToken(1), dec!(105.5));
        let mut events = adapter.events();

        let id = adapter
            .place_order(PlaceOrderParams {
                client_order_id: ClientOrderId("c1".into()),
                exchange: ExchangeId::Simulated,
                instrument_token: InstrumentToken(1),
                side: Side::Buy,
                quantity: dec!(10),
                kind: OrderKind::Market,
                price: None,
                trigger_price: None,
                time_in_force: TimeInForce::Day,
            })
            .await
            .unwrap();

        match events.recv().await.unwrap() {
            BrokerEvent::OrderUpdate(update) => {
                assert_eq!(update.broker_order_id, id);
                assert_eq!(update.status, OrderStatus::Filled);
                assert_eq!(update.average_price, Some(dec!(105.5)));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

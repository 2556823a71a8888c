//! The broker adapter contract: subscription control, order requests, and
//! the event stream a connected broker pushes ticks and order updates
//! through. Any concrete broker integration implements [`BrokerAdapter`];
//! `core` wires the chosen implementation into the engine.

use crate::error::ExecutionError;
use crate::order::{
    BrokerOrderId, Margins, ModifyOrderParams, OrderUpdate, PlaceOrderParams, Position, Quote,
    SubscriptionMode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ixtrade_data::{Candle, Tick};
use ixtrade_markets::{ExchangeId, Instrument, InstrumentToken};
use rust_decimal::Decimal;

/// Connectivity and tick/order-update events a broker pushes asynchronously.
/// Consumed from `BrokerAdapter::events`.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    Ticks(Vec<Tick>),
    OrderUpdate(OrderUpdate),
    Connected,
    Disconnected,
    Reconnected,
    Error(String),
}

/// Unified interface to a broker's streaming and order-execution surface.
/// `place_order` must never be retried by an implementation or by
/// [`crate::retry::RetryingClient`] — every other method may be retried with
/// backoff on transient failure.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Takes ownership of the adapter's event receiver. Must be called
    /// exactly once; a second call returns `None`.
    fn events(&self) -> tokio::sync::mpsc::UnboundedReceiver<BrokerEvent>;

    async fn subscribe(&self, tokens: &[InstrumentToken]) -> Result<(), ExecutionError>;
    async fn unsubscribe(&self, tokens: &[InstrumentToken]) -> Result<(), ExecutionError>;
    async fn set_mode(
        &self,
        tokens: &[InstrumentToken],
        mode: SubscriptionMode,
    ) -> Result<(), ExecutionError>;

    async fn place_order(&self, params: PlaceOrderParams) -> Result<BrokerOrderId, ExecutionError>;
    async fn modify_order(&self, params: ModifyOrderParams) -> Result<(), ExecutionError>;
    async fn cancel_order(&self, id: &BrokerOrderId) -> Result<(), ExecutionError>;

    async fn get_orders(&self) -> Result<Vec<OrderUpdate>, ExecutionError>;
    async fn get_order_history(
        &self,
        id: &BrokerOrderId,
    ) -> Result<Vec<OrderUpdate>, ExecutionError>;
    async fn get_positions(&self) -> Result<Vec<Position>, ExecutionError>;
    async fn get_margins(&self) -> Result<Margins, ExecutionError>;
    async fn get_instruments(&self, exchange: ExchangeId) -> Result<Vec<Instrument>, ExecutionError>;
    async fn get_historical_data(
        &self,
        token: InstrumentToken,
        interval_minutes: u32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, ExecutionError>;
    async fn get_quote(&self, token: InstrumentToken) -> Result<Quote, ExecutionError>;
    async fn get_ltp(&self, token: InstrumentToken) -> Result<Decimal, ExecutionError>;
}

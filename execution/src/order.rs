//! Wire-level order and subscription-mode types exchanged with the broker
//! adapter.

use chrono::{DateTime, Utc};
use ixtrade_macros::DisplayId;
use ixtrade_markets::{ExchangeId, InstrumentToken, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionMode {
    Ltp,
    Quote,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    StopMarket,
    StopLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    ImmediateOrCancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, DisplayId)]
pub struct ClientOrderId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, DisplayId)]
pub struct BrokerOrderId(pub String);

/// Parameters for a new order. `placeOrder` is the one broker call the
/// retrying client must never retry (duplicate submission risk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderParams {
    pub client_order_id: ClientOrderId,
    pub exchange: ExchangeId,
    pub instrument_token: InstrumentToken,
    pub side: Side,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyOrderParams {
    pub broker_order_id: BrokerOrderId,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// How a rejection message is classified so the caller can decide whether to
/// arm a cooldown, the kill switch, or just retry the trade later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionKind {
    CircuitBreaker,
    Margin,
    SessionClosed,
    Duplicate,
    Other,
}

/// Classifies a raw broker rejection message by keyword. Broker messages
/// are free text; this looks for the phrases brokers commonly use rather
/// than relying on a stable error code.
pub fn classify_rejection(message: &str) -> RejectionKind {
    let lower = message.to_lowercase();
    if lower.contains("circuit") || lower.contains("price band") {
        RejectionKind::CircuitBreaker
    } else if lower.contains("margin") {
        RejectionKind::Margin
    } else if lower.contains("session") || lower.contains("market closed") {
        RejectionKind::SessionClosed
    } else if lower.contains("duplicate") {
        RejectionKind::Duplicate
    } else {
        RejectionKind::Other
    }
}

/// Broker-pushed order state update, as delivered to `onOrderUpdate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub broker_order_id: BrokerOrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub instrument_token: InstrumentToken,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    pub average_price: Option<Decimal>,
    pub rejection_message: Option<String>,
    pub exchange_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub instrument_token: InstrumentToken,
    pub quantity: Decimal,
    pub average_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Margins {
    pub available: Decimal,
    pub used: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last_price: Decimal,
}

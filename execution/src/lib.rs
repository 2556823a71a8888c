#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Execution — broker adapter contract, retry, and order-update dedup
//!
//! Defines the [`BrokerAdapter`] trait a concrete broker integration must
//! implement, a [`RetryingClient`] that adds backoff retry to every call
//! except the non-retryable `place_order`, an [`OrderUpdateDedup`] cache,
//! and rejection-message classification. A [`MockBrokerAdapter`] backs the
//! analytics backtest harness and integration tests.

pub mod adapter;
pub mod dedup;
pub mod error;
pub mod mock;
pub mod order;
pub mod retry;

pub use adapter::{BrokerAdapter, BrokerEvent};
pub use dedup::OrderUpdateDedup;
pub use error::ExecutionError;
pub use mock::MockBrokerAdapter;
pub use order::{
    classify_rejection, BrokerOrderId, ClientOrderId, Margins, ModifyOrderParams, OrderKind,
    OrderStatus, OrderUpdate, PlaceOrderParams, Position, Quote, RejectionKind, SubscriptionMode,
    TimeInForce,
};
pub use retry::{RetryPolicy, RetryingClient};

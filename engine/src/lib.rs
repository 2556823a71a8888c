#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! Facade crate: a single `use ixtrade_engine::*;` entry point over every
//! other crate in the workspace, plus the [`admin`] and [`push`] surface
//! contracts an external transport (HTTP, WebSocket, CLI — none of which
//! lives here) implements against.
//!
//! # Example
//! ```rust
//! use ixtrade_engine::markets::ExchangeId;
//! let _exchange: ExchangeId = ExchangeId::Nse;
//! ```

/// Admin surface: named operations (health, status, kill switch, halt
/// reset, recent trades, subscriptions, optimizer snapshot/reload/reset).
pub mod admin;

/// Push surface: a subscription bus streaming status, trade deltas, chart
/// updates, and raw ticks to authorized subscribers.
pub mod push;

// Re-export of internal crates under namespaces matching their own names.
pub use ixtrade_analytics as analytics;
pub use ixtrade_core as core;
pub use ixtrade_data as data;
pub use ixtrade_execution as execution;
pub use ixtrade_integration as integration;
pub use ixtrade_markets as markets;
pub use ixtrade_risk as risk;
pub use ixtrade_strategies as strategies;
pub use ixtrade_trader as trader;

// Flat re-export of the symbols a caller reaches for most often.
pub use ixtrade_core::{EngineConfig, EngineError, System, SystemBuilder};
pub use ixtrade_markets::{ExchangeId, Side};

pub mod prelude {
    pub use crate::admin::{AdminApi, AdminError, AdminResult};
    pub use crate::core::{EngineConfig, System, SystemBuilder};
    pub use crate::execution::{BrokerAdapter, PlaceOrderParams};
    pub use crate::markets::{ExchangeId, Side};
    pub use crate::push::{PushBus, PushEvent};
    pub use crate::trader::{Trade, TradeManager, TradeState};
}

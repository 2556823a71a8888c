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

//! # Trader — trade lifecycle, dynamic exits, and the entry admission chain
//!
//! [`Trade`] and its [`TradeState`] machine are owned by a [`TradeStore`];
//! [`DynamicExitManager`] recomputes stop-loss/target patches per tick; and
//! [`TradeManager`] runs the admission chain, places orders through an
//! [`ixtrade_execution::BrokerAdapter`], and drives trades from broker
//! order-update events.

pub mod error;
pub mod exit;
pub mod manager;
pub mod store;
pub mod trade;

pub use error::TradeError;
pub use exit::{DynamicExitConfig, DynamicExitManager, ExitAction, ExitPlan, MaxHoldSkipReason};
pub use manager::{AdmissionDenial, EntryPlan, TradeManager};
pub use store::TradeStore;
pub use trade::{OptionMeta, OptionType, Trade, TradeState};

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

//! # Risk — admission chain, portfolio governor, adaptive optimizer
//!
//! Implements admission chain stages 2-5: [`RiskEngine`],
//! [`PortfolioGovernor`], [`AdaptiveOptimizer`] and [`OrderRateLimiter`],
//! plus the [`MarketCalendar`] stage-1 gate.

pub mod approved;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod governor;
pub mod optimizer;
pub mod rate_limiter;

pub use approved::{RiskApproved, RiskRefused};
pub use calendar::{MarketCalendar, SessionBucket};
pub use engine::{RiskDenialReason, RiskEngine, RiskEngineConfig, RiskKey};
pub use error::RiskError;
pub use governor::{GovernorConfig, GovernorDenialReason, PortfolioGovernor};
pub use optimizer::{
    AdaptiveOptimizer, OptimizerConfigParams, OptimizerKeySnapshot, OptimizerVerdict, SpreadRegime,
};
pub use rate_limiter::{OrderRateLimiter, RateLimiterConfig};

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

//! # Strategies — signal pipeline, regime selector, strategy family
//!
//! The [`Signal`] and [`registry::Strategy`] types define the seam this
//! crate's callers evaluate against; [`family`] holds the concrete
//! strategy implementations and [`selector::Selector`] classifies the
//! OPEN/TREND/RANGE regime that gates which of them run.

pub mod family;
pub mod indicators;
pub mod registry;
pub mod selector;
pub mod signal;

pub use registry::{Strategy, StrategyCandidate, StrategyRegistry};
pub use selector::{Selector, SelectorConfig};
pub use signal::{Regime, Signal, Style};

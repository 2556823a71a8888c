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
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]
//! Wiring layer for the intraday trading engine: configuration, the
//! aggregated error type, the process-wide HALT bus, logging setup,
//! shutdown signalling, entry-plan construction, and the [`System`] that
//! ties the market/data/strategies/risk/execution/trader crates into one
//! running process.
//!
//! Everything here is plumbing. The actual trading logic — indicators,
//! strategies, risk budgeting, order lifecycle, dynamic exits — lives in
//! its own crate; this crate only owns the parts that don't belong to any
//! single one of those: how they're configured, how they're wired
//! together, and how the whole thing starts up and shuts down.

/// Flat configuration loaded from TOML at startup.
pub mod config;

/// Aggregated error type for the wiring layer.
pub mod error;

/// Process-wide HALT flag and error-report bus.
pub mod halt;

/// Tracing subscriber setup.
pub mod logging;

/// Turns a strategy signal into a sized entry plan.
pub mod signal;

/// Graceful shutdown signal and traits.
pub mod shutdown;

/// Wires every subsystem into a running engine.
pub mod system;

/// Bounded ring buffers for recent-event telemetry.
pub mod telemetry;

pub use config::EngineConfig;
pub use error::EngineError;
pub use halt::HaltBus;
pub use system::{System, SystemBuilder};

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
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Markets
//!
//! Instrument, exchange and side primitives shared by every other crate in
//! the workspace. An `Instrument` here is immutable once cached: tick size,
//! lot size, segment and (for derivatives) expiry/strike never change for a
//! given token during the session.

pub mod exchange;
pub mod instrument;
pub mod repo;
pub mod side;

pub use exchange::{Exchange, ExchangeId};
pub use instrument::{Instrument, InstrumentError, InstrumentToken, InstrumentType};
pub use repo::InstrumentRepo;
pub use side::Side;

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

//! # Data — tick ingestion and candle aggregation
//!
//! Owns the broker-facing [`TickIngestor`](ingestor::TickIngestor), the
//! durable [`CandleStore`](store::CandleStore) and the in-memory
//! [`CandleCache`](cache::CandleCache). Nothing in
//! this crate talks to the broker directly beyond the narrow
//! [`TokenResubscriber`](ingestor::TokenResubscriber) capability — the
//! concrete broker adapter lives in `execution` and is wired in at the
//! `core` layer.

pub mod cache;
pub mod candle;
pub mod error;
pub mod ingestor;
pub mod queue;
pub mod store;
pub mod tick;

pub use cache::CandleCache;
pub use candle::{Candle, CandleSource};
pub use error::DataError;
pub use ingestor::{TickIngestor, TokenResubscriber};
pub use store::{CandleStore, InMemoryCandleStore};
pub use tick::{Depth, IngestEvent, Tick, TickBatch};
